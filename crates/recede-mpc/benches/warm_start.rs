//! 热启动变换性能基准测试
//!
//! 3000 步策略（3s 时域、dt = 1ms）每周期平移并延长的开销。

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nalgebra::{DMatrix, DVector};
use recede_mpc::{TailExtension, WarmStartTransformer};
use recede_optcon::{Problem, QuadraticCost, QuadraticCostConfig, SecondOrderSystem};
use recede_types::{Policy, Trajectory};

const STEPS: usize = 3000;
const DT: f64 = 0.001;

fn problem() -> Problem {
    let cost = QuadraticCost::from_config(&QuadraticCostConfig {
        q_diag: vec![1.0, 1.0],
        r_diag: vec![1.0],
        q_final_diag: vec![1.0, 1.0],
        x_ref: None,
        u_ref: None,
    })
    .unwrap();
    Problem::new(
        Arc::new(SecondOrderSystem::new(1.0, 0.7)),
        cost,
        DVector::zeros(2),
        STEPS as f64 * DT,
    )
    .unwrap()
}

fn previous() -> (Policy, Trajectory) {
    let ff = (0..STEPS).map(|k| DVector::from_element(1, k as f64 * DT)).collect();
    let fb = vec![DMatrix::from_row_slice(1, 2, &[-1.0, -0.5]); STEPS];
    let policy = Policy::new(0.0, DT, ff, Some(fb)).unwrap();
    let trajectory = Trajectory::constant(DVector::zeros(2), STEPS + 1, DT, 0.0).unwrap();
    (policy, trajectory)
}

fn bench_transform(c: &mut Criterion) {
    let problem = problem();
    let (policy, trajectory) = previous();
    let state = DVector::from_vec(vec![0.1, 0.0]);

    for tail in [TailExtension::HoldLast, TailExtension::ProblemDefault] {
        let transformer = WarmStartTransformer::new(DT, tail);
        c.bench_function(&format!("warm_start_shift_5_{:?}", tail), |b| {
            b.iter(|| {
                let ws = transformer
                    .transform(
                        &problem,
                        Some(black_box(&policy)),
                        Some(black_box(&trajectory)),
                        &state,
                        black_box(0.005),
                        STEPS,
                    )
                    .unwrap();
                black_box(ws)
            })
        });
    }

    let transformer = WarmStartTransformer::new(DT, TailExtension::HoldLast);
    c.bench_function("warm_start_identity", |b| {
        b.iter(|| {
            let ws = transformer
                .transform(&problem, Some(&policy), None, &state, 0.0, STEPS)
                .unwrap();
            black_box(ws)
        })
    });
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
