use std::sync::LazyLock;

use byte_pool::{Block, BytePool};

static BYTE_POOL: LazyLock<BytePool<Vec<u8>>> = LazyLock::new(BytePool::new);

pub type PooledBuffer = Block<'static, Vec<u8>>;

/// Returns an empty scratch buffer with at least `size` bytes of capacity.
/// The buffer is returned to the pool when dropped.
pub fn get_pooled_buffer(size: usize) -> PooledBuffer {
    let mut buf = BYTE_POOL.alloc(size);
    buf.clear();
    buf
}
