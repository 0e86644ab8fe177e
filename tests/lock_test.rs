use aflock::{AflockError, LockHandle, LockOptions};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn fast_options() -> LockOptions {
    LockOptions::new().with_poll_interval(Duration::from_millis(50))
}

#[tokio::test]
async fn test_uncontended_acquire_is_immediate() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut lock = LockHandle::new(&lock_path).unwrap();
    assert!(lock_path.exists());

    let start = Instant::now();
    let guard = lock.acquire(None).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));

    guard.release().unwrap();
    assert!(lock_path.exists(), "Lock file should persist after release");
}

#[tokio::test]
async fn test_acquire_release_acquire_same_handle() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut lock = LockHandle::new(&lock_path).unwrap();
    assert!(!lock.is_held());

    let guard = lock.acquire(None).await.unwrap();
    guard.release().unwrap();
    assert!(!lock.is_held());

    let guard = lock.acquire(None).await.unwrap();
    drop(guard);
    assert!(!lock.is_held());

    let _guard = lock.acquire(Some(Duration::ZERO)).await.unwrap();
}

#[tokio::test]
async fn test_contended_acquire_times_out_within_one_poll_interval() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut holder = LockHandle::new(&lock_path).unwrap();
    let _held = holder.acquire(None).await.unwrap();

    let mut waiter = LockHandle::with_options(
        &lock_path,
        LockOptions::new().with_poll_interval(Duration::from_millis(100)),
    )
    .unwrap();

    let start = Instant::now();
    let result = waiter.acquire(Some(Duration::from_millis(500))).await;
    let elapsed = start.elapsed();

    match result {
        Err(AflockError::LockTimeout { path, duration }) => {
            assert_eq!(path, lock_path);
            assert_eq!(duration, Duration::from_millis(500));
        }
        other => panic!("expected LockTimeout, got {:?}", other.map(|_| ())),
    }
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(800));
}

#[tokio::test]
async fn test_handle_default_timeout_applies() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut holder = LockHandle::new(&lock_path).unwrap();
    let _held = holder.acquire(None).await.unwrap();

    // Default 1s poll interval; the sleep is clamped to the remaining budget
    let mut waiter = LockHandle::with_timeout(&lock_path, Duration::from_millis(300)).unwrap();

    let start = Instant::now();
    let result = waiter.acquire(None).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(AflockError::LockTimeout { .. })));
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(900));
}

#[tokio::test]
async fn test_zero_timeout_makes_exactly_one_attempt() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut holder = LockHandle::new(&lock_path).unwrap();
    let held = holder.acquire(None).await.unwrap();

    let mut waiter = LockHandle::new(&lock_path).unwrap();
    let start = Instant::now();
    let result = waiter.acquire(Some(Duration::ZERO)).await.map(|_| ());

    assert!(matches!(
        result,
        Err(AflockError::LockTimeout { duration, .. }) if duration == Duration::ZERO
    ));
    assert!(start.elapsed() < Duration::from_millis(100));

    held.release().unwrap();
    let _guard = waiter.acquire(Some(Duration::ZERO)).await.unwrap();
}

#[tokio::test]
async fn test_waiter_acquires_after_holder_releases() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut holder = LockHandle::new(&lock_path).unwrap();
    let held = holder.acquire(None).await.unwrap();

    let waiter_path = lock_path.clone();
    let waiter = tokio::spawn(async move {
        let mut lock = LockHandle::with_options(&waiter_path, fast_options()).unwrap();
        let start = Instant::now();
        let guard = lock.acquire(None).await.unwrap();
        let waited = start.elapsed();
        guard.release().unwrap();
        waited
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    held.release().unwrap();

    let waited = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter should finish once the lock is free")
        .unwrap();
    assert!(waited >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_simple_lock_scenario() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test_lock");

    let mut a = LockHandle::new(&lock_path).unwrap();
    let start = Instant::now();
    let held = a.acquire(None).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));

    let mut b = LockHandle::new(&lock_path).unwrap();
    let start = Instant::now();
    let result = b.acquire(Some(Duration::from_secs(1))).await.map(|_| ());
    let elapsed = start.elapsed();
    assert!(matches!(result, Err(AflockError::LockTimeout { .. })));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(2500));

    held.release().unwrap();

    let start = Instant::now();
    let _guard = b.acquire(None).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_try_acquire_reports_contention() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut a = LockHandle::new(&lock_path).unwrap();
    let mut b = LockHandle::new(&lock_path).unwrap();

    let held = a.try_acquire().unwrap().expect("lock should be free");
    assert!(b.try_acquire().unwrap().is_none());

    drop(held);
    assert!(b.try_acquire().unwrap().is_some());
}

#[test]
fn test_release_when_not_held_is_harmless() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut lock = LockHandle::new(&lock_path).unwrap();
    lock.release().unwrap();
    lock.release().unwrap();
    assert!(lock.try_acquire().unwrap().is_some());
}

#[test]
fn test_dropping_handle_frees_lock() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("test.lock");

    let mut a = LockHandle::new(&lock_path).unwrap();
    std::mem::forget(a.try_acquire().unwrap().unwrap());
    assert!(a.is_held());

    let mut b = LockHandle::new(&lock_path).unwrap();
    assert!(b.try_acquire().unwrap().is_none());

    drop(a);
    assert!(b.try_acquire().unwrap().is_some());
}

#[test]
fn test_open_failure_is_creation_error() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("missing").join("test.lock");

    let result = LockHandle::new(&lock_path);
    assert!(matches!(
        result,
        Err(AflockError::LockCreationFailed { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_symlink_policy() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("real.lock");
    let link = temp.path().join("link.lock");
    std::fs::write(&target, b"").unwrap();
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let strict = LockHandle::with_options(&link, LockOptions::new().follow_symlinks(false));
    assert!(matches!(
        strict,
        Err(AflockError::LockCreationFailed { .. })
    ));

    // Following the link locks the target itself
    let mut via_link = LockHandle::new(&link).unwrap();
    let _held = via_link.try_acquire().unwrap().unwrap();
    let mut direct = LockHandle::new(&target).unwrap();
    assert!(direct.try_acquire().unwrap().is_none());
}
