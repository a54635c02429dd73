//! Best-effort conversion of fetched feed bytes into text.
//!
//! Publishers routinely mislabel (or do not label) the character set of their
//! feeds, so the declared encoding is ignored. Instead the bytes are tried
//! against a fixed ladder of encodings and the first strict decode wins:
//!
//! 1. UTF-8
//! 2. GBK
//! 3. GB18030
//! 4. Windows-1252 (the Latin-1 superset browsers use for `iso-8859-1`)
//!
//! `encoding_rs` implements GBK with the full GB18030 decoder (four-byte
//! sequences included), so the GB18030 rung never accepts bytes the GBK rung
//! rejected. It stays in the ladder so the reported encoding is explicit when
//! the ladder is changed, and costs one extra failed decode on non-Chinese
//! feeds. Legacy `gb2312` labels are a subset of GBK and need no rung of their
//! own.
//!
//! A byte-order mark short-circuits the ladder. When nothing decodes cleanly
//! the final rung is applied lossily, so [`resolve`] always yields text.

use encoding_rs::{Encoding, GB18030, GBK, UTF_8, WINDOWS_1252};
use tracing::debug;

/// Ordered list of encodings tried by [`decode`].
pub fn ladder() -> [&'static Encoding; 4] {
    [UTF_8, GBK, GB18030, WINDOWS_1252]
}

/// Result of decoding a feed body.
#[derive(Debug)]
pub struct Decoded {
    /// The decoded text.
    pub text: String,
    /// The encoding that produced `text`.
    pub encoding: &'static Encoding,
    /// `true` when undecodable sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Decode `bytes` into text, never failing.
pub fn resolve(bytes: &[u8]) -> String {
    decode(bytes).text
}

/// Decode `bytes`, reporting which encoding was used.
pub fn decode(bytes: &[u8]) -> Decoded {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        let (text, lossy) = encoding.decode_with_bom_removal(bytes);
        debug!(encoding = encoding.name(), lossy, "Decoded feed using byte-order mark");
        return Decoded {
            text: text.into_owned(),
            encoding,
            lossy,
        };
    }

    for encoding in ladder() {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!(encoding = encoding.name(), bytes = bytes.len(), "Decoded feed");
            return Decoded {
                text: text.into_owned(),
                encoding,
                lossy: false,
            };
        }
    }

    let fallback = WINDOWS_1252;
    let (text, lossy) = fallback.decode_without_bom_handling(bytes);
    debug!(encoding = fallback.name(), lossy, "Decoded feed lossily");
    Decoded {
        text: text.into_owned(),
        encoding: fallback,
        lossy,
    }
}
