///
/// Solves the dense system `a * x = b` by LU decomposition with partial
/// pivoting. Returns `None` when the matrix is numerically singular.
///
#[allow(clippy::needless_range_loop)]
pub fn lu_solve<const N: usize>(mut a: [[f64; N]; N], b: [f64; N]) -> Option<[f64; N]>
{
    let mut pivot = [0usize; N];
    for (i, p) in pivot.iter_mut().enumerate()
    {
        *p = i;
    }
    for k in 0..N
    {
        // largest remaining entry in column k
        let mut p = k;
        let mut max = a[k][k].abs();
        for i in k + 1..N
        {
            if a[i][k].abs() > max
            {
                max = a[i][k].abs();
                p = i;
            }
        }
        if max < 1e-300 || !max.is_finite()
        {
            return None;
        }
        if p != k
        {
            a.swap(p, k);
            pivot.swap(p, k);
        }
        for i in k + 1..N
        {
            a[i][k] /= a[k][k];
            let f = a[i][k];
            for j in k + 1..N
            {
                a[i][j] -= f * a[k][j];
            }
        }
    }
    let mut x = [0.0; N];
    // forward substitution with unit lower triangle
    for i in 0..N
    {
        let mut sum = b[pivot[i]];
        for j in 0..i
        {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum;
    }
    for i in (0..N).rev()
    {
        let mut sum = x[i];
        for j in i + 1..N
        {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }
    Some(x)
}

#[test]
fn check_lu_solve_4x4()
{
    let a = [
        [2.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 3.0, 1.0],
        [1.0, 4.0, 1.0, 1.0],
        [5.0, 0.0, 2.0, 1.0],
    ];
    let x_exact = [1.0, -2.0, 0.5, 3.0];
    let mut b = [0.0; 4];
    for i in 0..4
    {
        for j in 0..4
        {
            b[i] += a[i][j] * x_exact[j];
        }
    }
    let x = lu_solve(a, b).unwrap();
    for i in 0..4
    {
        assert!((x[i] - x_exact[i]).abs() < 1e-12, "{} {}", x[i], x_exact[i]);
    }
}

#[test]
fn check_lu_singular()
{
    let a = [[1.0, 2.0], [2.0, 4.0]];
    assert!(lu_solve(a, [1.0, 2.0]).is_none());
}
