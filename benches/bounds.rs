//! Bound inference benchmarks.
//!
//! Every iteration builds a fresh analysis, so the memo stores start empty and the numbers
//! include moment computation and recurrence solving.
//!
//! Run with:
//! ```bash
//! cargo bench --bench bounds
//! ```

use amber_rs::analysis::Analysis;
use amber_rs::decision::decide_termination;
use amber_rs::expr::Expr;
use amber_rs::parser::parse_program;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const FAIR_WALK: &str = "x = 10\nwhile x > 0:\n    x = x - 1 @ 1/2; x + 1\nend\n";
const COUPLED: &str = "\
x = 10
y = 0
while x > y:
    z = RV(uniform, -1, 1)
    y = y + 1 @ 1/2; y
    x = x + z - 1/2 @ 3/4; x + 1
end
";
const GROWING_STEPS: &str = "\
x = 10
y = 0
while x > 0:
    y = y + 1
    x = x - y @ 1/2; x + y
end
";

fn bench_powers(c: &mut Criterion) {
    let program = parse_program(COUPLED).unwrap();
    let mut group = c.benchmark_group("bounds_of_power");
    for power in [1, 2, 3, 4] {
        let expr = Expr::var("x").pow(power);
        group.bench_with_input(BenchmarkId::from_parameter(power), &expr, |b, expr| {
            b.iter(|| {
                let mut analysis = Analysis::new(&program);
                analysis.bounds_of_expr(expr)
            })
        });
    }
    group.finish();
}

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide_termination");
    for (name, source) in [
        ("fair_walk", FAIR_WALK),
        ("coupled", COUPLED),
        ("growing_steps", GROWING_STEPS),
    ] {
        let program = parse_program(source).unwrap();
        group.bench_function(name, |b| b.iter(|| decide_termination(&program)));
    }
    group.finish();
}

criterion_group!(benches, bench_powers, bench_decide);
criterion_main!(benches);
