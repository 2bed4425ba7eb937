use rand::rngs::OsRng;
use rand::Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::cell::UnsafeCell;

thread_local! {
    static RNG: UnsafeCell<ChaCha20Rng> = UnsafeCell::new(ChaCha20Rng::from_seed(OsRng.gen()));
}

pub struct SecureRng;

impl SecureRng {
    pub fn next_u8() -> u8 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { (*rng.get()).next_u32() as u8 }
        })
    }

    pub fn next_u64() -> u64 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { (*rng.get()).next_u64() }
        })
    }

    pub fn next_u128() -> u128 {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            let rng_ref = unsafe { &mut *rng.get() };
            let mut bytes = [0u8; 16];
            rng_ref.fill_bytes(&mut bytes);
            u128::from_le_bytes(bytes)
        })
    }

    pub fn fill_bytes(dest: &mut [u8]) {
        RNG.with(|rng| {
            // Only one thread accesses this RNG so this is safe
            unsafe { (*rng.get()).fill_bytes(dest) }
        })
    }
}
