use bunker::core::cipher::{Age, Cipher, DeploymentKey};
use bunker::core::vault::{pack, unpack};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const SIZES: [usize; 4] = [1024, 16 * 1024, 256 * 1024, 1024 * 1024];

/// Incompressible-ish payload of given size.
fn generate_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i.wrapping_mul(31) ^ (i >> 3)) as u8).collect()
}

/// Workspace-like tree: `files` variable files of `size` bytes each.
fn generate_tree(files: usize, size: usize) -> (TempDir, Vec<String>) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("host_vars")).unwrap();
    let mut manifest = vec!["host_vars".to_string()];
    for i in 0..files {
        fs::write(
            dir.path().join(format!("host_vars/host{}", i)),
            generate_payload(size),
        )
        .unwrap();
    }
    fs::write(dir.path().join("hosts.yml"), "all:\n  hosts: {}\n").unwrap();
    manifest.push("hosts.yml".to_string());
    (dir, manifest)
}

/// Seal and unseal buffers of varying size.
fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_decrypt");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    let cipher = Age::new(&DeploymentKey::generate()).unwrap();
    for size in SIZES {
        let payload = generate_payload(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("roundtrip", format!("{}B", size)),
            &payload,
            |b, payload| {
                b.iter(|| {
                    let sealed = cipher.encrypt(black_box(payload)).unwrap();
                    black_box(cipher.decrypt(black_box(&sealed)).unwrap());
                });
            },
        );
    }
    group.finish();
}

/// Build the compressed archive of a workspace tree.
fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));

    for files in [10, 100] {
        let (dir, manifest) = generate_tree(files, 4096);
        group.throughput(Throughput::Bytes((files * 4096) as u64));
        group.bench_function(BenchmarkId::new("files", files), |b| {
            b.iter(|| black_box(pack(dir.path(), black_box(&manifest), &[]).unwrap()));
        });
    }
    group.finish();
}

/// Full seal path without version control: pack, encrypt, decrypt, unpack.
fn bench_seal_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("seal_cycle");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));

    let cipher = Age::new(&DeploymentKey::generate()).unwrap();
    let (dir, manifest) = generate_tree(50, 4096);
    let out = TempDir::new().unwrap();
    group.bench_function("50x4KiB", |b| {
        b.iter(|| {
            let sealed = cipher
                .encrypt(&pack(dir.path(), &manifest, &[]).unwrap())
                .unwrap();
            let archive = cipher.decrypt(&sealed).unwrap();
            black_box(unpack(out.path(), &archive).unwrap());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encrypt_decrypt, bench_pack, bench_seal_cycle);
criterion_main!(benches);
