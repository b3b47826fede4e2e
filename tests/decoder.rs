use gf256_rref::fec::TableKernel;
use gf256_rref::{transform, CodedSymbol, Decoder, DecoderConfig, Error, KernelKind, Progress};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_sources(k: usize, len: usize, rng: &mut StdRng) -> Vec<Vec<u8>> {
    (0..k).map(|_| (0..len).map(|_| rng.gen()).collect()).collect()
}

fn make_repair(sources: &[Vec<u8>], rng: &mut StdRng) -> CodedSymbol {
    let coefficients: Vec<u8> = (0..sources.len()).map(|_| rng.gen()).collect();
    let payload = transform(&TableKernel, &coefficients, sources).unwrap();
    CodedSymbol::new(coefficients, payload)
}

#[test]
fn recovery_low_loss() {
    gf256_rref::logger::init_with("debug");
    let mut rng = StdRng::seed_from_u64(1);
    let k = 10;
    let sources = make_sources(k, 64, &mut rng);
    let mut dec = Decoder::new(k, 64, KernelKind::Table.build());
    for (i, s) in sources.iter().enumerate() {
        if i != 3 {
            dec.add_symbol(CodedSymbol::systematic(i, k, s.clone()))
                .unwrap();
        }
    }
    assert!(!dec.is_complete());
    while !dec.is_complete() {
        dec.add_symbol(make_repair(&sources, &mut rng)).unwrap();
    }
    assert_eq!(dec.decode().unwrap(), sources);
}

#[test]
fn recovery_high_loss() {
    let mut rng = StdRng::seed_from_u64(2);
    let k = 16;
    let sources = make_sources(k, 32, &mut rng);
    for kind in KernelKind::ALL {
        let mut dec = Decoder::new(k, 32, kind.build());
        for (i, s) in sources.iter().enumerate() {
            if i % 2 == 0 {
                dec.add_symbol(CodedSymbol::systematic(i, k, s.clone()))
                    .unwrap();
            }
        }
        let mut sent = 0;
        while !dec.is_complete() {
            dec.add_symbol(make_repair(&sources, &mut rng)).unwrap();
            sent += 1;
            assert!(sent < 4 * k, "decoder never completed");
        }
        let stats = dec.stats();
        assert_eq!(stats.innovative, k as u64);
        assert_eq!(stats.received, stats.innovative + stats.redundant);
        assert_eq!(dec.decode().unwrap(), sources);
    }
}

#[test]
fn repairs_only() {
    let mut rng = StdRng::seed_from_u64(3);
    let k = 24;
    let sources = make_sources(k, 100, &mut rng);
    let mut dec = Decoder::new(k, 100, KernelKind::Product.build());
    let mut last = Progress::Redundant;
    while last != Progress::Complete {
        last = dec.add_symbol(make_repair(&sources, &mut rng)).unwrap();
    }
    assert_eq!(dec.rank(), k);
    assert_eq!(dec.decode().unwrap(), sources);
}

#[test]
fn duplicate_systematic_symbol_is_redundant() {
    let mut dec = Decoder::new(2, 4, KernelKind::Table.build());
    let sym = CodedSymbol::systematic(0, 2, vec![1, 2, 3, 4]);
    assert_eq!(
        dec.add_symbol(sym.clone()).unwrap(),
        Progress::Innovative { rank: 1 }
    );
    assert_eq!(dec.add_symbol(sym).unwrap(), Progress::Redundant);
    assert_eq!(dec.stats().redundant, 1);
}

#[test]
fn decoder_from_config_file() {
    let path = std::env::temp_dir().join(format!("gf256-rref-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[decoder]\nsymbols = 4\nsymbol_len = 8\nkernel = \"shift\"\n",
    )
    .unwrap();
    let cfg = DecoderConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut dec = Decoder::from_config(&cfg).unwrap();
    assert_eq!(dec.symbols(), 4);
    assert_eq!(dec.symbol_len(), 8);

    let mut rng = StdRng::seed_from_u64(4);
    let sources = make_sources(4, 8, &mut rng);
    while !dec.is_complete() {
        dec.add_symbol(make_repair(&sources, &mut rng)).unwrap();
    }
    assert_eq!(dec.decode().unwrap(), sources);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = DecoderConfig {
        symbols: 0,
        ..DecoderConfig::default()
    };
    assert!(matches!(Decoder::from_config(&cfg), Err(Error::Config(_))));

    let missing = std::env::temp_dir().join("gf256-rref-does-not-exist.toml");
    assert!(matches!(DecoderConfig::from_file(&missing), Err(Error::Io(_))));
}
