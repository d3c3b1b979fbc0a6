//! A single path's read/write lock record, write-preference, fair to writers.

use std::sync::Mutex;

use tokio::sync::Notify;

/// Shared or exclusive acquisition mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Default)]
struct State {
    readers: u32,
    writers: u32,
    write_requests: u32,
}

/// Tracks a `write_requests` increment made by [`LockRecord::lock_write`].
/// Dropped armed (i.e. the `lock_write` future was cancelled before it
/// acquired the lock), it decrements the counter back out; `disarm` is
/// called once the counter has already been decremented on the success
/// path, so the drop becomes a no-op.
struct WriteRequest<'a> {
    record: &'a LockRecord,
    armed: bool,
}

impl<'a> WriteRequest<'a> {
    fn armed(record: &'a LockRecord) -> Self {
        WriteRequest { record, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for WriteRequest<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut s = self.record.state.lock().unwrap();
            s.write_requests -= 1;
        }
    }
}

/// Read/write lock with write-preference: a pending writer blocks new readers,
/// so an invalidation does not starve behind an unbounded stream of readers.
pub struct LockRecord {
    state: Mutex<State>,
    notify: Notify,
}

impl Default for LockRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl LockRecord {
    pub fn new() -> Self {
        LockRecord { state: Mutex::new(State::default()), notify: Notify::new() }
    }

    pub async fn lock_read(&self) {
        loop {
            // Register interest before checking state: if the check below
            // fails and an unlocker calls `notify_waiters` in the gap before
            // we `.await` it, a `Notified` created only after that point
            // would miss the wakeup and block forever. Creating it first
            // means it's already registered by the time the unlocker looks.
            let notified = self.notify.notified();
            {
                let mut s = self.state.lock().unwrap();
                if s.writers == 0 && s.write_requests == 0 {
                    s.readers += 1;
                    return;
                }
            }
            notified.await;
        }
    }

    pub fn unlock_read(&self) {
        let mut s = self.state.lock().unwrap();
        debug_assert!(s.readers > 0);
        s.readers -= 1;
        if s.readers == 0 {
            drop(s);
            self.notify.notify_waiters();
        }
    }

    pub async fn lock_write(&self) {
        {
            let mut s = self.state.lock().unwrap();
            s.write_requests += 1;
        }
        // Cancelling this future anywhere in the loop below must still
        // decrement `write_requests`, or a parked writer that gets dropped
        // leaves every future `lock_read` on this record blocked forever.
        let mut request = WriteRequest::armed(self);
        loop {
            let notified = self.notify.notified();
            {
                let mut s = self.state.lock().unwrap();
                if s.readers == 0 && s.writers == 0 {
                    s.write_requests -= 1;
                    s.writers += 1;
                    request.disarm();
                    return;
                }
            }
            notified.await;
        }
    }

    pub fn unlock_write(&self) {
        let mut s = self.state.lock().unwrap();
        debug_assert!(s.writers > 0);
        s.writers -= 1;
        drop(s);
        self.notify.notify_waiters();
    }

    pub async fn lock(&self, mode: LockMode) {
        match mode {
            LockMode::Shared => self.lock_read().await,
            LockMode::Exclusive => self.lock_write().await,
        }
    }

    pub fn unlock(&self, mode: LockMode) {
        match mode {
            LockMode::Shared => self.unlock_read(),
            LockMode::Exclusive => self.unlock_write(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn readers_do_not_block_each_other() {
        let rec = Arc::new(LockRecord::new());
        rec.lock_read().await;
        let ok = tokio::time::timeout(Duration::from_millis(100), rec.lock_read()).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn writer_blocks_until_reader_releases() {
        let rec = Arc::new(LockRecord::new());
        rec.lock_read().await;
        let rec2 = rec.clone();
        let writer = tokio::spawn(async move {
            rec2.lock_write().await;
            rec2.unlock_write();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());
        rec.unlock_read();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn pending_writer_blocks_new_readers() {
        let rec = Arc::new(LockRecord::new());
        rec.lock_read().await;
        let rec2 = rec.clone();
        let writer = tokio::spawn(async move {
            rec2.lock_write().await;
            tokio::time::sleep(Duration::from_millis(30)).await;
            rec2.unlock_write();
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        rec.unlock_read();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let rec3 = rec.clone();
        let late_reader = tokio::spawn(async move {
            rec3.lock_read().await;
            rec3.unlock_read();
        });
        writer.await.unwrap();
        late_reader.await.unwrap();
    }

    #[tokio::test]
    async fn notify_registered_before_state_check_is_not_missed() {
        // A waiter that's about to block must already be registered with
        // `Notify` by the time the unlocker runs, or the wakeup is lost and
        // the waiter hangs forever (no timeout would save it outside tests).
        let rec = Arc::new(LockRecord::new());
        rec.lock_read().await;
        let rec2 = rec.clone();
        let writer = tokio::spawn(async move {
            rec2.lock_write().await;
            rec2.unlock_write();
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        rec.unlock_read();
        tokio::time::timeout(Duration::from_millis(200), writer).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancelling_a_parked_writer_clears_its_write_request() {
        let rec = Arc::new(LockRecord::new());
        rec.lock_read().await;

        let rec2 = rec.clone();
        let fut = rec2.lock_write();
        tokio::pin!(fut);
        let polled = tokio::time::timeout(Duration::from_millis(10), &mut fut).await;
        assert!(polled.is_err());
        drop(fut);

        rec.unlock_read();

        // If the cancelled writer leaked its `write_requests` increment,
        // this would block forever instead of completing.
        let ok = tokio::time::timeout(Duration::from_millis(100), rec.lock_read()).await;
        assert!(ok.is_ok());
    }
}
