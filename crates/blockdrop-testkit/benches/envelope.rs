use blockdrop_crypto::{ContentKey, Envelope, WrappedKey, X25519StaticSecret};
use blockdrop_testkit::fixtures::{Party, VaultFixture};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

const SIZES: [usize; 3] = [1024, 64 * 1024, 1024 * 1024];

fn seal_open(c: &mut Criterion) {
    let key = ContentKey::from_bytes([7u8; 32]);
    let mut group = c.benchmark_group("envelope");

    for size in SIZES {
        let plaintext = vec![0xA5u8; size];
        let sealed = Envelope::seal(&plaintext, &key).unwrap();
        let encoded = sealed.to_base64();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("seal", size), &plaintext, |b, p| {
            b.iter(|| Envelope::seal(black_box(p), &key).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("open_base64", size), &encoded, |b, e| {
            b.iter(|| {
                Envelope::from_base64(black_box(e))
                    .and_then(|env| env.open(&key))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn key_wrap(c: &mut Criterion) {
    let key = ContentKey::from_bytes([7u8; 32]);
    let recipient = X25519StaticSecret::from_bytes([9u8; 32]);
    let wrapped = WrappedKey::wrap(&key, &recipient.public_key()).unwrap();

    c.bench_function("wrap_key", |b| {
        b.iter(|| WrappedKey::wrap(black_box(&key), &recipient.public_key()).unwrap())
    });
    c.bench_function("unwrap_key", |b| {
        b.iter(|| black_box(&wrapped).unwrap(&recipient).unwrap())
    });
}

fn vault_download(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let alice = Party::with_seed([1u8; 32]);
    let bob = Party::with_seed([2u8; 32]);

    let (fixture, file_id) = runtime.block_on(async {
        let fixture = VaultFixture::new().await;
        let receipt = fixture
            .vault
            .upload(&alice.secret, "bench.bin", &vec![0u8; 64 * 1024])
            .await
            .unwrap();
        fixture
            .vault
            .share(receipt.file_id, &alice.secret, &receipt.key, &bob.public, 0)
            .await
            .unwrap();
        (fixture, receipt.file_id)
    });

    c.bench_function("vault_download_cached_64k", |b| {
        b.iter(|| {
            runtime
                .block_on(fixture.vault.download(file_id, &bob.secret))
                .unwrap()
        })
    });
}

criterion_group!(benches, seal_open, key_wrap, vault_download);
criterion_main!(benches);
