use packflow_core::{ErrorKind, Preset, Pump, PumpConfig};
use packflow_gzip::{GzipDecoder, GzipEncoder};
use proptest::prelude::*;

fn compress(data: &[u8], block: usize) -> Vec<u8> {
    let mut out = Vec::new();
    Pump::new(PumpConfig::uniform(block).unwrap())
        .run(&mut GzipEncoder::new(Preset::DEFAULT), &mut &data[..], &mut out)
        .unwrap();
    out
}

fn decompress(data: &[u8], block: usize) -> packflow_core::Result<Vec<u8>> {
    let mut out = Vec::new();
    Pump::new(PumpConfig::uniform(block).unwrap()).run(
        &mut GzipDecoder::new(),
        &mut &data[..],
        &mut out,
    )?;
    Ok(out)
}

#[test]
fn test_output_independent_of_block_size() {
    let data = b"block size must not change the decoded bytes ".repeat(700);
    let compressed = compress(&data, 16384);
    let expected = decompress(&compressed, 16384).unwrap();
    for block in [1, 17, 4096] {
        assert_eq!(decompress(&compressed, block).unwrap(), expected);
    }
    assert_eq!(expected, data);
}

#[test]
fn test_every_truncation_is_rejected() {
    let compressed = compress(b"truncate me at every offset", 16384);
    for cut in 0..compressed.len() {
        let err = decompress(&compressed[..cut], 16384).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data, "cut at {cut}");
    }
}

#[test]
fn test_extreme_preset_roundtrip() {
    let data = b"strongest deflate setting ".repeat(2000);
    let mut compressed = Vec::new();
    Pump::new(PumpConfig::uniform(4096).unwrap())
        .run(
            &mut GzipEncoder::new(Preset::new(9, true).unwrap()),
            &mut &data[..],
            &mut compressed,
        )
        .unwrap();
    assert!(compressed.len() < data.len() / 10);
    for block in [1, 4096] {
        assert_eq!(decompress(&compressed, block).unwrap(), data);
    }
}

proptest! {
    #[test]
    fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096), block in 1usize..600) {
        let compressed = compress(&data, block);
        prop_assert_eq!(decompress(&compressed, block).unwrap(), data);
    }
}
