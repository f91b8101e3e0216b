//! 离散动力学的有限差分线性化
//!
//! 对 RK4 离散映射 `x⁺ = F(x, u)` 做中心差分，得到 `A = ∂F/∂x`、`B = ∂F/∂u`。

use nalgebra::DMatrix;

use crate::integrator::rk4_step;
use crate::system::ControlledSystem;
use recede_types::{ControlVector, StateVector};

/// 在 `(x, u, t)` 处线性化一个 `dt` 步
pub fn linearize_discrete(
    system: &dyn ControlledSystem,
    x: &StateVector,
    u: &ControlVector,
    t: f64,
    dt: f64,
    eps: f64,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let n = x.len();
    let m = u.len();
    let mut a = DMatrix::zeros(n, n);
    let mut b = DMatrix::zeros(n, m);

    for j in 0..n {
        let mut xp = x.clone();
        let mut xm = x.clone();
        xp[j] += eps;
        xm[j] -= eps;
        let diff = rk4_step(system, &xp, u, t, dt) - rk4_step(system, &xm, u, t, dt);
        a.set_column(j, &(diff / (2.0 * eps)));
    }

    for j in 0..m {
        let mut up = u.clone();
        let mut um = u.clone();
        up[j] += eps;
        um[j] -= eps;
        let diff = rk4_step(system, x, &up, t, dt) - rk4_step(system, x, &um, t, dt);
        b.set_column(j, &(diff / (2.0 * eps)));
    }

    (a, b)
}
