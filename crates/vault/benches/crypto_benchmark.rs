use antigravity_vault::engine::VaultEngine;
use antigravity_vault::names::{derive_name_key, encrypt_name};
use antigravity_vault::sentinel;
use antigravity_primitives::kdf::derive_master_key_scrypt;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn bench_sentinel_build_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault_sentinel");
    group.measurement_time(Duration::from_secs(10));

    let master = derive_master_key_scrypt("pw", &[0u8; 16]).unwrap();

    group.bench_function("build", |b| {
        b.iter(|| black_box(sentinel::build(&master).unwrap()));
    });

    let body = sentinel::build(&master).unwrap();
    let (nonce, ciphertext) = body.split_at(12);
    group.bench_function("verify", |b| {
        b.iter(|| black_box(sentinel::verify(&master, nonce, ciphertext).unwrap()));
    });

    group.finish();
}

fn bench_name_encryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault_names");
    group.measurement_time(Duration::from_secs(10));

    let master = derive_master_key_scrypt("pw", &[0u8; 16]).unwrap();
    let name_key = derive_name_key(&master).unwrap();

    group.bench_function("encrypt_name", |b| {
        b.iter(|| black_box(encrypt_name(&name_key, "quarterly_report_final_v3.docx").unwrap()));
    });

    group.finish();
}

fn bench_folder_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault_folder");
    group.measurement_time(Duration::from_secs(20));
    group.sample_size(20);

    let engine = VaultEngine::default();
    let payload = vec![0x5Au8; 256 * 1024];

    group.bench_function("encrypt_then_decrypt_ten_files", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            for i in 0..10 {
                fs::write(dir.path().join(format!("file_{i}.bin")), &payload).unwrap();
            }
            engine.vault_encrypt(dir.path(), "benchmark-pw", None).unwrap();
            engine.vault_decrypt(dir.path(), "benchmark-pw", None).unwrap();
            black_box(());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_sentinel_build_verify, bench_name_encryption, bench_folder_roundtrip);
criterion_main!(benches);
