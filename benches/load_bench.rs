//! Benchmarks for directory loading.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::Path;
use terrawalk::{digest, Loader};

/// Write a module tree `depth` levels deep where every module declares
/// `fanout` children and `per_module` resources.
fn write_tree(dir: &Path, depth: usize, fanout: usize, per_module: usize) {
    std::fs::create_dir_all(dir).unwrap();
    let mut body = String::new();
    for r in 0..per_module {
        body.push_str(&format!(
            "resource \"aws_instance\" \"web{r}\" {{\n  ami = \"ami-{r}\"\n  tags = {{\n    Name = \"web-{r}\"\n  }}\n}}\n\n"
        ));
    }
    if depth > 0 {
        for c in 0..fanout {
            body.push_str(&format!("module \"m{c}\" {{\n  source = \"./m{c}\"\n}}\n\n"));
            write_tree(&dir.join(format!("m{c}")), depth - 1, fanout, per_module);
        }
    }
    std::fs::write(dir.join("main.tf"), body).unwrap();
}

fn bench_load_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_tree");
    for depth in [1, 2, 3] {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), depth, 3, 5);
        let loader = Loader::default();

        group.bench_with_input(BenchmarkId::from_parameter(depth), dir.path(), |b, root| {
            b.iter(|| {
                let out = loader.load(black_box(root)).unwrap();
                black_box(out);
            });
        });
    }
    group.finish();
}

fn bench_resource_digest(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), 3, 3, 5);
    let resources = Loader::default().load(dir.path()).unwrap();

    c.bench_function("resource_digest", |b| {
        b.iter(|| {
            let hash = digest::resource_digest(black_box(&resources)).unwrap();
            black_box(hash);
        });
    });
}

criterion_group!(benches, bench_load_tree, bench_resource_digest);
criterion_main!(benches);
