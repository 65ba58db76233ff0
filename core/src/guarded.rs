use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

static NEXT_ORDER: AtomicU64 = AtomicU64::new(1);

/// Value behind one exclusive lock, every access goes through a scoped guard
///
/// Used for [`AssetManager`](crate::AssetManager): holding the guard keeps the
/// source list, and with it all cookies handed out, stable.
#[derive(Debug)]
pub struct Guarded<T> {
    order: u64,
    inner: Mutex<T>,
}

/// Guards of two values locked together
pub enum LockedPair<'a, T> {
    /// Both sides name the same value
    Same(MutexGuard<'a, T>),
    Distinct(MutexGuard<'a, T>, MutexGuard<'a, T>),
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Guarded<T> {
        Guarded {
            order: NEXT_ORDER.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(value),
        }
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Lock `a` and `b`, always in creation order so concurrent pairs can't deadlock
    pub fn lock_pair<'a>(a: &'a Guarded<T>, b: &'a Guarded<T>) -> LockedPair<'a, T> {
        if a.order == b.order {
            return LockedPair::Same(a.lock());
        }

        if a.order < b.order {
            let first = a.lock();
            let second = b.lock();
            LockedPair::Distinct(first, second)
        } else {
            let second = b.lock();
            let first = a.lock();
            LockedPair::Distinct(first, second)
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn pair_locking() {
        let a = Guarded::new(1);
        let b = Guarded::new(2);

        match Guarded::lock_pair(&b, &a) {
            LockedPair::Distinct(first, second) => assert_eq!((*first, *second), (2, 1)),
            LockedPair::Same(_) => panic!("expected two guards"),
        }
        assert!(matches!(Guarded::lock_pair(&a, &a), LockedPair::Same(_)));
    }

    #[test]
    fn opposite_orders_do_not_deadlock() {
        let a = Arc::new(Guarded::new(0u32));
        let b = Arc::new(Guarded::new(0u32));

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let (a, b) = (Arc::clone(&a), Arc::clone(&b));
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let (x, y) = if i % 2 == 0 { (&a, &b) } else { (&b, &a) };
                        if let LockedPair::Distinct(mut first, mut second) = Guarded::lock_pair(&**x, &**y) {
                            *first += 1;
                            *second += 1;
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(*a.lock(), 4000);
        let b = Arc::try_unwrap(b).unwrap();
        assert_eq!(b.into_inner(), 4000);
    }
}
