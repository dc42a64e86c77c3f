use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use geotess::{errors::GeoTessError, storage::{attributes::AttributeDefinitions, numeric_kind::NumericKind, value_cell::ValueCell},
    GridBuilder, HorizontalInterpolation, Model, ModelMetaData, Position, Profile, RadialInterpolation};

fn build_model() -> Result<Model, GeoTessError>
{
    // Two layers on an icosahedral grid, a smooth velocity field in each.
    let grid = Arc::new(GridBuilder::icosahedron().levels(6).build()?);
    let attributes = AttributeDefinitions::new(&["vp"], &["km/sec"], NumericKind::Float)?;
    let metadata = ModelMetaData::new("bench", &["mantle", "crust"], &[0, 0], attributes)?;
    let vertices = grid.clone();
    Model::from_fn(metadata, grid, |vertex, layer| {
        let u = vertices.vertex(vertex);
        let radii: Vec<f32> = if layer == 0 { vec![3480.0, 4500.0, 5500.0, 6336.0] } else { vec![6336.0, 6371.0] };
        let cells = radii.iter().map(|r| ValueCell::from(vec![(8.0 + u[0] + u[2] * 0.5 + *r as f64 / 6371.0) as f32])).collect();
        Profile::from_radii_and_cells(radii, cells)
    })
}

fn queries() -> Vec<(f64, f64, f64)>
{
    (0..1000).map(|i| {
        let f = i as f64;
        ((f * 0.37) % 180.0 - 90.0, (f * 1.13) % 360.0 - 180.0, (f * 7.0) % 2500.0)
    }).collect()
}

fn interpolate(model: &Model, horizontal: HorizontalInterpolation, points: &[(f64, f64, f64)]) -> Result<f64, GeoTessError>
{
    let mut position = Position::new(model, horizontal, RadialInterpolation::Linear);
    let mut sum = 0.0;
    for (lat, lon, depth) in points.iter()
    {
        position.set_lat_lon_depth(*lat, *lon, *depth)?;
        sum += position.value(0)?;
    }
    Ok(sum)
}

fn run_position(c: &mut Criterion)
{
    let model = build_model().unwrap();
    let points = queries();
    c.bench_function("linear", |b| b.iter(|| interpolate(&model, HorizontalInterpolation::Linear, &points).unwrap()));
    c.bench_function("natural neighbor", |b| b.iter(|| interpolate(&model, HorizontalInterpolation::NaturalNeighbor, &points).unwrap()));
}

fn run_batch(c: &mut Criterion)
{
    let model = build_model().unwrap();
    let shape = model.metadata().earth_shape;
    let points: Vec<_> = queries().iter().map(|(lat, lon, depth)| {
        let u = shape.vector(*lat, *lon);
        (u, shape.earth_radius(&u) - depth)
    }).collect();
    c.bench_function("batch", |b| b.iter(|| model.interpolate_batch(&points, 0, HorizontalInterpolation::Linear, RadialInterpolation::Linear)));
}

criterion_group!(benches, run_position, run_batch);
criterion_main!(benches);
