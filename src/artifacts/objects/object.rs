use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::Write;

/// A git object: an immutable raw byte payload plus a type tag.
///
/// The payload is the object body *without* the `<type> <len>\0` header;
/// the header is prepended when hashing and encoding. Transformations on
/// concrete object kinds return new instances, never mutate in place, so
/// cached objects can be shared freely across a DAG traversal.
pub trait GitObject {
    fn object_type(&self) -> ObjectType;

    /// The raw object body, without the storage header.
    fn raw(&self) -> &Bytes;

    /// The content-addressed hash: SHA-1 over `<type> <len>\0<raw>`.
    ///
    /// This is the exact git object-hash algorithm; matching it bit-for-bit
    /// is what makes the produced repositories readable by stock git.
    fn hash(&self) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.header());
        hasher.update(self.raw());

        let digest = hasher.finalize();
        ObjectId::new_unchecked(format!("{digest:x}"))
    }

    /// The loose-object payload: zlib deflate of `<type> <len>\0<raw>`.
    fn encoded(&self) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&self.header())
            .and_then(|_| encoder.write_all(self.raw()))
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(Bytes::from)
            .context("Unable to finish compressing object content")
    }

    fn header(&self) -> Vec<u8> {
        format!("{} {}\0", self.object_type().as_str(), self.raw().len()).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::tree::Tree;
    use std::io::Read;

    #[test]
    fn empty_tree_has_well_known_hash() {
        let tree = Tree::new(Bytes::new()).unwrap();
        assert_eq!(tree.hash().as_ref(), Tree::EMPTY_HASH);
    }

    #[test]
    fn encoded_bytes_decompress_to_header_and_raw() {
        let tree = Tree::new(Bytes::new()).unwrap();
        let encoded = tree.encoded().unwrap();

        let mut decoder = flate2::read::ZlibDecoder::new(&*encoded);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();

        assert_eq!(decompressed, b"tree 0\0");
    }
}
