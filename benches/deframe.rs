use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use tsip_gpsdo::core::ByteOrder;
use tsip_gpsdo::protocol::encode_message;
use tsip_gpsdo::{Driver, DriverConfig};

/// One second of typical receiver output: primary and supplemental timing
/// plus a signal-level broadcast.
fn one_second() -> BytesMut {
    let mut buf = BytesMut::new();
    encode_message(&mut buf, ByteOrder::Big, 0x8F, |w| {
        w.byte(0xAB)
            .dword(0x0001_1010)
            .word(2200)
            .sword(18)
            .byte(0x03)
            .byte(16)
            .byte(16)
            .byte(16)
            .byte(16)
            .byte(10)
            .word(2022);
    });
    encode_message(&mut buf, ByteOrder::Big, 0x8F, |w| {
        w.byte(0xAC).byte(7).byte(0).byte(100).dword(0).word(0).word(0x0010).byte(0).byte(0).byte(0).byte(0);
        w.single(1.5).single(0.02).dword(0x8000_1010).single(0.1).single(41.0);
        w.double(0.6).double(-2.1).double(120.0).single(2.5).dword(0);
    });
    encode_message(&mut buf, ByteOrder::Big, 0x47, |w| {
        w.byte(8);
        for prn in [1u8, 4, 7, 9, 16, 21, 27, 30] {
            w.byte(prn).single(40.0 + prn as f32 / 4.0);
        }
    });
    buf
}

fn bench_deframe(c: &mut Criterion) {
    let second = one_second();
    let mut stream = BytesMut::new();
    for _ in 0..64 {
        stream.extend_from_slice(&second);
    }

    let mut group = c.benchmark_group("driver");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("push_bytes", |b| {
        b.iter(|| {
            let config = DriverConfig {
                resync_on_start: false,
                ..DriverConfig::default()
            };
            let mut driver = Driver::new(config).unwrap();
            for &byte in stream.iter() {
                black_box(driver.push_byte(byte));
            }
            driver.diagnostics().messages
        })
    });
    group.finish();
}

criterion_group!(benches, bench_deframe);
criterion_main!(benches);
