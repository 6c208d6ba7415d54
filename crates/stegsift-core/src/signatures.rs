use crate::model::{RiskTier, ScanRegion};

/// Broad family a magic number belongs to. Drives the base risk tier of a
/// match before confidence scoring runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureClass {
    Executable,
    Archive,
    Document,
    Media,
}

impl SignatureClass {
    pub fn base_risk(self) -> RiskTier {
        match self {
            Self::Executable => RiskTier::Critical,
            Self::Archive => RiskTier::High,
            Self::Document => RiskTier::Medium,
            Self::Media => RiskTier::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executable => "executable",
            Self::Archive => "archive",
            Self::Document => "document",
            Self::Media => "media",
        }
    }
}

/// A known embedded-payload magic number.
#[derive(Debug)]
pub struct Signature {
    pub name: &'static str,
    pub magic: &'static [u8],
    pub class: SignatureClass,
    pub extensions: &'static [&'static str],
    /// Shortest payload of this kind that could plausibly be real. Matches
    /// closer than this to the end of the input are discarded.
    pub min_plausible_size: usize,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        name: "mz",
        magic: b"MZ",
        class: SignatureClass::Executable,
        extensions: &["exe", "dll"],
        min_plausible_size: 1024,
    },
    Signature {
        name: "elf",
        magic: b"\x7fELF",
        class: SignatureClass::Executable,
        extensions: &["elf", "so"],
        min_plausible_size: 512,
    },
    Signature {
        name: "zip",
        magic: b"PK\x03\x04",
        class: SignatureClass::Archive,
        extensions: &["zip", "jar", "apk"],
        min_plausible_size: 64,
    },
    Signature {
        name: "rar",
        magic: b"Rar!\x1a\x07",
        class: SignatureClass::Archive,
        extensions: &["rar"],
        min_plausible_size: 64,
    },
    Signature {
        name: "7z",
        magic: b"7z\xbc\xaf\x27\x1c",
        class: SignatureClass::Archive,
        extensions: &["7z"],
        min_plausible_size: 64,
    },
    Signature {
        name: "gzip",
        magic: b"\x1f\x8b\x08",
        class: SignatureClass::Archive,
        extensions: &["gz", "tgz"],
        min_plausible_size: 32,
    },
    Signature {
        name: "pdf",
        magic: b"%PDF-",
        class: SignatureClass::Document,
        extensions: &["pdf"],
        min_plausible_size: 128,
    },
    Signature {
        name: "png",
        magic: b"\x89PNG\r\n\x1a\n",
        class: SignatureClass::Media,
        extensions: &["png"],
        min_plausible_size: 256,
    },
    Signature {
        name: "jpeg",
        magic: b"\xff\xd8\xff",
        class: SignatureClass::Media,
        extensions: &["jpg", "jpeg"],
        min_plausible_size: 256,
    },
    Signature {
        name: "gif87a",
        magic: b"GIF87a",
        class: SignatureClass::Media,
        extensions: &["gif"],
        min_plausible_size: 128,
    },
    Signature {
        name: "gif89a",
        magic: b"GIF89a",
        class: SignatureClass::Media,
        extensions: &["gif"],
        min_plausible_size: 128,
    },
];

/// One magic-number hit inside a scan region. Offsets are absolute within
/// the input bytes.
#[derive(Debug, Clone, Copy)]
pub struct SignatureMatch {
    pub signature: &'static Signature,
    pub offset: usize,
}

/// The built-in signature table plus region scanning over it.
#[derive(Debug, Clone, Copy)]
pub struct ByteSignatureIndex {
    signatures: &'static [Signature],
}

impl ByteSignatureIndex {
    pub fn builtin() -> Self {
        Self { signatures: SIGNATURES }
    }

    pub fn signatures(&self) -> &'static [Signature] {
        self.signatures
    }

    /// Every signature hit inside `region`, unfiltered. Matches within the
    /// last `min_plausible_size` bytes of the input are dropped here because
    /// no payload of that kind fits behind them.
    pub fn scan_region(&self, bytes: &[u8], region: ScanRegion) -> Vec<SignatureMatch> {
        let start = region.start.min(bytes.len());
        let end = region.end.min(bytes.len());
        if start >= end {
            return Vec::new();
        }
        let window = &bytes[start..end];
        let mut out = Vec::new();
        for sig in self.signatures {
            for rel in find_all(window, sig.magic) {
                let offset = start + rel;
                if offset.saturating_add(sig.min_plausible_size) > bytes.len() {
                    continue;
                }
                out.push(SignatureMatch { signature: sig, offset });
            }
        }
        out.sort_by(|a, b| {
            a.offset.cmp(&b.offset).then_with(|| a.signature.name.cmp(b.signature.name))
        });
        out
    }
}

/// Naive substring search returning every match offset, overlapping included.
pub fn find_all(hay: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut hits = Vec::new();
    if needle.is_empty() || hay.len() < needle.len() {
        return hits;
    }
    let last = hay.len() - needle.len();
    let mut i = 0usize;
    while i <= last {
        if &hay[i..i + needle.len()] == needle {
            hits.push(i);
        }
        i += 1;
    }
    hits
}
