use std::{sync::Arc, thread};

use framewise_pool::{Pool, Scratch, SCRATCH_SIZE};

#[test]
fn get_from_empty_pool_allocates() {
    let pool = Pool::<Vec<u8>>::new(4);
    assert_eq!(pool.available(), 0);

    let buf = pool.get();
    assert!(buf.is_empty());
    assert_eq!(pool.available(), 0);

    drop(buf);
    assert_eq!(pool.available(), 1);
}

#[test]
fn released_buffers_come_back_empty() {
    let pool = Pool::<Vec<u8>>::new(1);

    let mut buf = pool.get();
    buf.extend_from_slice(b"secret session data");
    buf.release();

    let buf = pool.get();
    assert!(buf.is_empty());
    assert!(buf.capacity() >= b"secret session data".len());
}

#[test]
fn full_pool_drops_extra_buffers() {
    let pool = Pool::<Vec<u8>>::new(2);

    let a = pool.get();
    let b = pool.get();
    let c = pool.get();
    drop((a, b, c));

    assert_eq!(pool.available(), pool.capacity());
    assert_eq!(pool.capacity(), 2);
}

#[test]
fn scratch_keeps_its_size() {
    let pool = Pool::<Scratch>::new(1);

    let mut s = pool.get();
    s[..4].copy_from_slice(&[1, 2, 3, 4]);
    drop(s);

    let s = pool.get();
    assert_eq!(s.len(), SCRATCH_SIZE);
}

#[test]
fn concurrent_sessions_share_a_pool() {
    let pool = Arc::new(Pool::<Vec<u8>>::new(4));

    let handles: Vec<_> = (0..8u8)
        .map(|id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for round in 0..500u32 {
                    let mut buf = pool.get();
                    assert!(buf.is_empty());

                    buf.extend_from_slice(&[id; 16]);
                    buf.extend_from_slice(&round.to_be_bytes());
                    assert_eq!(&buf[..16], &[id; 16]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(pool.available() <= pool.capacity());
}

#[test]
fn global_pools_are_usable() {
    let scratch = framewise_pool::scratch();
    let payload = framewise_pool::payload();

    assert!(scratch.capacity() > 0);
    assert!(payload.capacity() > 0);

    let buf = payload.get();
    assert!(buf.is_empty());
}
