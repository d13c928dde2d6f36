//! Arweave deep hash.
//!
//! The signature data of a transaction is not a flat concatenation: each
//! element is hashed with a type-and-length tag and list elements are chained
//! into an accumulator, all over SHA-384. Any change to any field, or to the
//! order of fields, changes the root hash.

use sha2::{Digest, Sha384};

#[derive(Debug, Clone, PartialEq)]
pub enum DeepHashItem {
    Blob(Vec<u8>),
    List(Vec<DeepHashItem>),
}

impl DeepHashItem {
    pub fn blob(data: impl Into<Vec<u8>>) -> Self {
        Self::Blob(data.into())
    }

    pub fn list(items: Vec<DeepHashItem>) -> Self {
        Self::List(items)
    }
}

pub fn deep_hash(item: &DeepHashItem) -> [u8; 48] {
    match item {
        DeepHashItem::Blob(data) => {
            let tag = [b"blob".as_slice(), data.len().to_string().as_bytes()].concat();
            sha384(&[sha384(&tag).as_slice(), sha384(data).as_slice()].concat())
        }
        DeepHashItem::List(items) => {
            let tag = [b"list".as_slice(), items.len().to_string().as_bytes()].concat();
            let mut acc = sha384(&tag);
            for child in items {
                acc = sha384(&[acc.as_slice(), deep_hash(child).as_slice()].concat());
            }
            acc
        }
    }
}

fn sha384(data: &[u8]) -> [u8; 48] {
    Sha384::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_hash_structure() {
        let data = b"some payload".to_vec();
        let tag = [b"blob".as_slice(), b"12"].concat();
        let expected = sha384(&[sha384(&tag).as_slice(), sha384(&data).as_slice()].concat());
        assert_eq!(deep_hash(&DeepHashItem::blob(data)), expected);
    }

    #[test]
    fn test_list_chains_accumulator() {
        let first = DeepHashItem::blob(b"one".to_vec());
        let second = DeepHashItem::blob(b"two".to_vec());

        let tag = [b"list".as_slice(), b"2"].concat();
        let mut acc = sha384(&tag);
        acc = sha384(&[acc.as_slice(), deep_hash(&first).as_slice()].concat());
        acc = sha384(&[acc.as_slice(), deep_hash(&second).as_slice()].concat());

        assert_eq!(deep_hash(&DeepHashItem::list(vec![first, second])), acc);
    }

    #[test]
    fn test_order_is_significant() {
        let a = DeepHashItem::blob(b"a".to_vec());
        let b = DeepHashItem::blob(b"b".to_vec());
        let forward = deep_hash(&DeepHashItem::list(vec![a.clone(), b.clone()]));
        let reversed = deep_hash(&DeepHashItem::list(vec![b, a]));
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_nesting_differs_from_flat() {
        let flat = DeepHashItem::list(vec![
            DeepHashItem::blob(b"x".to_vec()),
            DeepHashItem::blob(b"y".to_vec()),
        ]);
        let nested = DeepHashItem::list(vec![DeepHashItem::list(vec![
            DeepHashItem::blob(b"x".to_vec()),
            DeepHashItem::blob(b"y".to_vec()),
        ])]);
        assert_ne!(deep_hash(&flat), deep_hash(&nested));
    }

    #[test]
    fn test_empty_blob_is_distinct_from_empty_list() {
        assert_ne!(
            deep_hash(&DeepHashItem::blob(Vec::new())),
            deep_hash(&DeepHashItem::list(Vec::new()))
        );
    }
}
