//! Binary and text persistence of single profiles.
//!
//! Every record starts with the [`ProfileType`] ordinal. Binary fields are
//! big-endian; the text form is whitespace separated and ends in a newline.
//!
//! | variant       | payload                                  |
//! |---------------|------------------------------------------|
//! | empty         | bottom, top                              |
//! | thin          | radius, cell                             |
//! | constant      | bottom, top, cell                        |
//! | n-point       | n (i32), then n times (radius, cell)     |
//! | surface       | cell                                     |
//! | empty surface | nothing                                  |

use std::io::{Read, Write};

use crate::errors::GeoTessError;
use crate::storage::attributes::AttributeDefinitions;
use crate::storage::codec::{read_f32, read_i32, read_u8, write_f32, write_i32, write_u8, TextTokens};
use crate::storage::value_cell::ValueCell;

use super::constant::ProfileConstant;
use super::npoint::ProfileNPoint;
use super::profile::{Profile, ProfileType};
use super::simple::{ProfileEmpty, ProfileSurface, ProfileThin};

impl Profile
{
    pub fn write_binary<W: Write>(&self, output: &mut W) -> Result<(), GeoTessError>
    {
        write_u8(output, self.profile_type().ordinal())?;
        match self
        {
            Profile::Empty(p) =>
            {
                write_f32(output, p.radii[0])?;
                write_f32(output, p.radii[1])
            },
            Profile::Thin(p) =>
            {
                write_f32(output, p.radius)?;
                p.cell.write_binary(output)
            },
            Profile::Constant(p) =>
            {
                write_f32(output, p.radii[0])?;
                write_f32(output, p.radii[1])?;
                p.cell.write_binary(output)
            },
            Profile::NPoint(p) =>
            {
                write_i32(output, p.radii.len() as i32)?;
                for (radius, cell) in p.radii.iter().zip(p.cells.iter())
                {
                    write_f32(output, *radius)?;
                    cell.write_binary(output)?;
                }
                Ok(())
            },
            Profile::Surface(p) => p.cell.write_binary(output),
            Profile::SurfaceEmpty => Ok(()),
        }
    }

    ///
    /// Reads one profile whose value cells follow `definitions`.
    ///
    pub fn read_binary<R: Read>(input: &mut R, definitions: &AttributeDefinitions) -> Result<Profile, GeoTessError>
    {
        let profile_type = ProfileType::from_ordinal(read_u8(input)?)?;
        Ok(match profile_type
        {
            ProfileType::Empty =>
            {
                let bottom = read_f32(input)?;
                let top = read_f32(input)?;
                ProfileEmpty::new(bottom, top)?.into()
            },
            ProfileType::Thin =>
            {
                let radius = read_f32(input)?;
                ProfileThin::new(radius, ValueCell::read_binary(input, definitions)?)?.into()
            },
            ProfileType::Constant =>
            {
                let bottom = read_f32(input)?;
                let top = read_f32(input)?;
                ProfileConstant::new(bottom, top, ValueCell::read_binary(input, definitions)?)?.into()
            },
            ProfileType::NPoint =>
            {
                let n = read_node_count(read_i32(input)?)?;
                let mut radii = Vec::with_capacity(n);
                let mut cells = Vec::with_capacity(n);
                for _ in 0..n
                {
                    radii.push(read_f32(input)?);
                    cells.push(ValueCell::read_binary(input, definitions)?);
                }
                ProfileNPoint::new(radii, cells)?.into()
            },
            ProfileType::Surface => ProfileSurface::new(ValueCell::read_binary(input, definitions)?).into(),
            ProfileType::SurfaceEmpty => Profile::SurfaceEmpty,
        })
    }

    /// Appends the text record of this profile, terminated by a newline.
    pub fn write_text(&self, output: &mut String)
    {
        output.push_str(&self.profile_type().ordinal().to_string());
        match self
        {
            Profile::Empty(p) =>
            {
                output.push_str(&format!(" {} {}", p.radii[0], p.radii[1]));
            },
            Profile::Thin(p) =>
            {
                output.push_str(&format!(" {} ", p.radius));
                p.cell.write_text(output);
            },
            Profile::Constant(p) =>
            {
                output.push_str(&format!(" {} {} ", p.radii[0], p.radii[1]));
                p.cell.write_text(output);
            },
            Profile::NPoint(p) =>
            {
                output.push_str(&format!(" {}", p.radii.len()));
                for (radius, cell) in p.radii.iter().zip(p.cells.iter())
                {
                    output.push_str(&format!("\n{} ", radius));
                    cell.write_text(output);
                }
            },
            Profile::Surface(p) =>
            {
                output.push(' ');
                p.cell.write_text(output);
            },
            Profile::SurfaceEmpty => {},
        }
        output.push('\n');
    }

    pub fn read_text(input: &mut TextTokens<'_>, definitions: &AttributeDefinitions) -> Result<Profile, GeoTessError>
    {
        let profile_type = ProfileType::from_ordinal(input.parse::<u8>()?)?;
        Ok(match profile_type
        {
            ProfileType::Empty =>
            {
                let bottom = input.parse::<f32>()?;
                let top = input.parse::<f32>()?;
                ProfileEmpty::new(bottom, top)?.into()
            },
            ProfileType::Thin =>
            {
                let radius = input.parse::<f32>()?;
                ProfileThin::new(radius, ValueCell::read_text(input, definitions)?)?.into()
            },
            ProfileType::Constant =>
            {
                let bottom = input.parse::<f32>()?;
                let top = input.parse::<f32>()?;
                ProfileConstant::new(bottom, top, ValueCell::read_text(input, definitions)?)?.into()
            },
            ProfileType::NPoint =>
            {
                let n = read_node_count(input.parse::<i32>()?)?;
                let mut radii = Vec::with_capacity(n);
                let mut cells = Vec::with_capacity(n);
                for _ in 0..n
                {
                    radii.push(input.parse::<f32>()?);
                    cells.push(ValueCell::read_text(input, definitions)?);
                }
                ProfileNPoint::new(radii, cells)?.into()
            },
            ProfileType::Surface => ProfileSurface::new(ValueCell::read_text(input, definitions)?).into(),
            ProfileType::SurfaceEmpty => Profile::SurfaceEmpty,
        })
    }
}

fn read_node_count(n: i32) -> Result<usize, GeoTessError>
{
    if n < 2
    {
        return Err(GeoTessError::MalformedProfile(format!("an n-point profile needs at least 2 radii, found {}", n)));
    }
    Ok(n as usize)
}
