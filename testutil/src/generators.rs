/// Test data generators

use rand::Rng;

/// Generate an opaque block payload of printable characters
pub fn random_block_data(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Loopback base URL for a test peer
pub fn local_address(node_id: u64) -> String {
    format!("http://127.0.0.1:{}", 5000 + node_id)
}
