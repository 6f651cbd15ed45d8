use packflow_cli::{CodecKind, SessionConfig, build_codec, exit_code, transcode};
use packflow_core::{DriverConfig, ErrorKind, Pump, PumpConfig, Result};
use packflow_xzembed::EmbeddedOptions;
use proptest::prelude::*;
use std::io::{self, Write};

const FULL: [CodecKind; 3] = [CodecKind::Gzip, CodecKind::Zstd, CodecKind::Xz];

/// Decoder used for streams produced by `kind`.
const DECODERS: [(CodecKind, CodecKind); 4] = [
    (CodecKind::Gzip, CodecKind::Gzip),
    (CodecKind::Zstd, CodecKind::Zstd),
    (CodecKind::Xz, CodecKind::Xz),
    (CodecKind::Xz, CodecKind::XzEmbedded),
];

/// Accepts at most `max` bytes per write call.
struct ShortWriter {
    out: Vec<u8>,
    max: usize,
}

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.max);
        self.out.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn compress(kind: CodecKind, data: &[u8], level: u8) -> Vec<u8> {
    let config = SessionConfig::new(DriverConfig::compress(level, false).unwrap());
    let mut out = Vec::new();
    transcode(kind, &config, &mut &data[..], &mut out).unwrap();
    out
}

fn decompress_with(kind: CodecKind, config: &SessionConfig, data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    transcode(kind, config, &mut &data[..], &mut out)?;
    Ok(out)
}

fn decompress(kind: CodecKind, data: &[u8]) -> Result<Vec<u8>> {
    decompress_with(kind, &SessionConfig::new(DriverConfig::decompress()), data)
}

fn text(len: usize) -> Vec<u8> {
    const WORDS: [&str; 8] = [
        "gzip ", "zstd ", "xz ", "pump ", "block ", "session ", "engine ", "stream ",
    ];
    let mut seed: u32 = 0x1234_5678;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        out.extend_from_slice(WORDS[(seed % 8) as usize].as_bytes());
    }
    out.truncate(len);
    out
}

#[test]
fn test_roundtrip_every_codec() {
    let data = text(200_000);
    for (encoder, decoder) in DECODERS {
        // Level 1 keeps the xz dictionary within the embedded ceiling.
        let compressed = compress(encoder, &data, 1);
        assert!(compressed.len() < data.len());
        assert!(decompress(decoder, &compressed).unwrap() == data, "{decoder}");
    }
}

#[test]
fn test_block_size_and_short_writes() {
    let data = text(50_000);
    for (encoder, decoder) in DECODERS {
        let compressed = compress(encoder, &data, 1);
        for block in [1, 17, 4096, 16384] {
            let config = SessionConfig::new(
                DriverConfig::decompress().with_pump(PumpConfig::uniform(block).unwrap()),
            );
            let mut codec = build_codec(decoder, &config).unwrap();
            let mut writer = ShortWriter { out: Vec::new(), max: 5 };
            let stats = Pump::new(config.driver.pump)
                .run(&mut codec, &mut &compressed[..], &mut writer)
                .unwrap();
            assert_eq!(stats.bytes_out, data.len() as u64);
            assert!(writer.out == data, "{decoder} block {block}");
        }
    }
}

#[test]
fn test_compression_independent_of_block_size() {
    let data = text(30_000);
    for kind in FULL {
        let reference = compress(kind, &data, 6);
        let config = SessionConfig::new(
            DriverConfig::compress(6, false)
                .unwrap()
                .with_pump(PumpConfig::new(7, 3).unwrap()),
        );
        let mut small = Vec::new();
        transcode(kind, &config, &mut &data[..], &mut small).unwrap();
        assert_eq!(decompress(kind, &small).unwrap(), data, "{kind}");
        assert_eq!(decompress(kind, &reference).unwrap(), data, "{kind}");
    }
}

#[test]
fn test_empty_input() {
    for (kind, expected) in [
        (CodecKind::Gzip, Some(ErrorKind::Data)),
        (CodecKind::Zstd, None),
        (CodecKind::Xz, Some(ErrorKind::Data)),
        (CodecKind::XzEmbedded, Some(ErrorKind::Data)),
    ] {
        match decompress(kind, &[]) {
            Ok(out) => {
                assert!(expected.is_none(), "{kind} accepted empty input");
                assert!(out.is_empty());
            }
            Err(err) => assert_eq!(Some(err.kind()), expected, "{kind}"),
        }
    }
}

#[test]
fn test_empty_payload_roundtrip() {
    for (encoder, decoder) in DECODERS {
        let compressed = compress(encoder, b"", 6);
        assert!(!compressed.is_empty());
        assert!(decompress(decoder, &compressed).unwrap().is_empty(), "{decoder}");
    }
}

#[test]
fn test_concatenated_streams() {
    let mut zstd = compress(CodecKind::Zstd, b"one ", 3);
    zstd.extend(compress(CodecKind::Zstd, b"two", 3));
    assert_eq!(decompress(CodecKind::Zstd, &zstd).unwrap(), b"one two");

    let mut xz = compress(CodecKind::Xz, b"one ", 0);
    xz.extend(compress(CodecKind::Xz, b"two", 0));
    assert_eq!(decompress(CodecKind::Xz, &xz).unwrap(), b"one two");

    let concatenated = SessionConfig::new(DriverConfig::decompress()).with_embedded(
        EmbeddedOptions {
            concatenated: true,
            ..EmbeddedOptions::default()
        },
    );
    assert_eq!(
        decompress_with(CodecKind::XzEmbedded, &concatenated, &xz).unwrap(),
        b"one two"
    );
    assert_eq!(decompress(CodecKind::XzEmbedded, &xz).unwrap(), b"one ");

    // gzip stops after the first member.
    let mut gzip = compress(CodecKind::Gzip, b"one ", 6);
    gzip.extend(compress(CodecKind::Gzip, b"two", 6));
    assert_eq!(decompress(CodecKind::Gzip, &gzip).unwrap(), b"one ");
}

#[test]
fn test_bounded_memory() {
    // Preset 6 declares an 8 MiB dictionary.
    let compressed = compress(CodecKind::Xz, &text(10_000), 6);
    let err = decompress(CodecKind::XzEmbedded, &compressed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Memory);
    assert_eq!(exit_code(&err), 7);

    let raised = SessionConfig::new(DriverConfig::decompress()).with_embedded(EmbeddedOptions {
        dict_max: 8 << 20,
        ..EmbeddedOptions::default()
    });
    let restored = decompress_with(CodecKind::XzEmbedded, &raised, &compressed).unwrap();
    assert_eq!(restored, text(10_000));
}

#[test]
fn test_corruption_detected() {
    let data = text(20_000);

    let mut gzip = compress(CodecKind::Gzip, &data, 6);
    let crc = gzip.len() - 8;
    gzip[crc] ^= 0x01;

    let mut zstd = compress(CodecKind::Zstd, &data, 6);
    let last = zstd.len() - 1;
    zstd[last] ^= 0x01;

    let mut xz = compress(CodecKind::Xz, &data, 1);
    let mid = xz.len() / 2;
    xz[mid] ^= 0x01;

    for (kind, stream) in [
        (CodecKind::Gzip, &gzip),
        (CodecKind::Zstd, &zstd),
        (CodecKind::Xz, &xz),
        (CodecKind::XzEmbedded, &xz),
    ] {
        let err = decompress(kind, stream).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data, "{kind}");
        assert_eq!(exit_code(&err), 6);
    }
}

#[test]
fn test_higher_level_compresses_better() {
    let data = text(300_000);
    for kind in FULL {
        let fast = compress(kind, &data, 1);
        let best = compress(kind, &data, 6);
        assert!(best.len() <= fast.len(), "{kind}: {} vs {}", best.len(), fast.len());
    }
}

#[test]
fn test_trailing_output_after_last_input() {
    // Highly compressible input: a short compressed stream that expands to
    // far more than one output block, so most output is drained after the
    // reader has hit end of input.
    let data = vec![b'z'; 1 << 20];
    for (encoder, decoder) in DECODERS {
        let compressed = compress(encoder, &data, 1);
        assert!(compressed.len() < 16384);
        let config = SessionConfig::new(
            DriverConfig::decompress().with_pump(PumpConfig::new(16384, 1000).unwrap()),
        );
        let restored = decompress_with(decoder, &config, &compressed).unwrap();
        assert!(restored == data, "{decoder}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_roundtrip(
        data in proptest::collection::vec(any::<u8>(), 0..3000),
        pair in 0usize..4,
        block in 1usize..400,
    ) {
        let (encoder, decoder) = DECODERS[pair];
        let compressed = compress(encoder, &data, 0);
        let config = SessionConfig::new(
            DriverConfig::decompress().with_pump(PumpConfig::uniform(block).unwrap()),
        );
        prop_assert_eq!(decompress_with(decoder, &config, &compressed).unwrap(), data);
    }
}
