//! Chunked merkle data root.
//!
//! Transaction data is split into chunks of at most 256 KiB; when the split
//! would leave a final chunk under 32 KiB, the last full chunk and the
//! remainder are rebalanced into two roughly even chunks. Leaves commit to
//! the chunk hash and its end offset, branches to their children and the
//! split point, all over SHA-256 with 32-byte big-endian offset notes.

use sha2::{Digest, Sha256};

pub const MAX_CHUNK_SIZE: usize = 256 * 1024;
pub const MIN_CHUNK_SIZE: usize = 32 * 1024;

const NOTE_SIZE: usize = 32;

#[derive(Debug, Clone)]
struct Chunk {
    data_hash: [u8; 32],
    max_byte_range: usize,
}

#[derive(Debug, Clone)]
struct Node {
    id: [u8; 32],
    max_byte_range: usize,
}

/// Computes the data root for a transaction payload. Empty data has no root.
pub fn compute_root(data: &[u8]) -> Option<[u8; 32]> {
    if data.is_empty() {
        return None;
    }
    let leaves = generate_leaves(&chunk_data(data));
    Some(build_layers(leaves).id)
}

fn chunk_data(data: &[u8]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut rest = data;
    let mut cursor = 0usize;

    while rest.len() >= MAX_CHUNK_SIZE {
        let mut chunk_size = MAX_CHUNK_SIZE;

        // Rebalance so the trailing chunk never falls under the minimum.
        let next_chunk_size = rest.len() - MAX_CHUNK_SIZE;
        if next_chunk_size > 0 && next_chunk_size < MIN_CHUNK_SIZE {
            chunk_size = rest.len().div_ceil(2);
        }

        let (chunk, remainder) = rest.split_at(chunk_size);
        cursor += chunk.len();
        chunks.push(Chunk {
            data_hash: sha256(chunk),
            max_byte_range: cursor,
        });
        rest = remainder;
    }

    cursor += rest.len();
    chunks.push(Chunk {
        data_hash: sha256(rest),
        max_byte_range: cursor,
    });
    chunks
}

fn generate_leaves(chunks: &[Chunk]) -> Vec<Node> {
    chunks
        .iter()
        .map(|chunk| Node {
            id: sha256(
                &[
                    sha256(&chunk.data_hash).as_slice(),
                    sha256(&note(chunk.max_byte_range)).as_slice(),
                ]
                .concat(),
            ),
            max_byte_range: chunk.max_byte_range,
        })
        .collect()
}

fn build_layers(mut nodes: Vec<Node>) -> Node {
    while nodes.len() > 1 {
        let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
        for pair in nodes.chunks(2) {
            match pair {
                [single] => next.push(single.clone()),
                [left, right] => next.push(hash_branch(left, right)),
                _ => unreachable!(),
            }
        }
        nodes = next;
    }
    nodes.pop().expect("at least one node")
}

fn hash_branch(left: &Node, right: &Node) -> Node {
    let id = sha256(
        &[
            sha256(&left.id).as_slice(),
            sha256(&right.id).as_slice(),
            sha256(&note(left.max_byte_range)).as_slice(),
        ]
        .concat(),
    );
    Node {
        id,
        max_byte_range: right.max_byte_range,
    }
}

/// Offset as a 32-byte big-endian integer.
fn note(value: usize) -> [u8; NOTE_SIZE] {
    let mut buf = [0u8; NOTE_SIZE];
    buf[NOTE_SIZE - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    buf
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
