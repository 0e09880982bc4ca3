use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use once_singleton::{InitError, Singleton, TrySingleton};

#[test]
fn repeated_access_returns_same_instance() {
   static CALLS: AtomicUsize = AtomicUsize::new(0);

   let singleton: Singleton<String> = Singleton::new(|| {
      CALLS.fetch_add(1, Ordering::SeqCst);
      String::from("instance")
   });
   assert!(!singleton.is_ready());
   assert_eq!(singleton.get(), None);

   let first = singleton.instance();
   let second = singleton.instance();
   assert!(std::ptr::eq(first, second));
   assert_eq!(first, "instance");
   assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn hundred_thread_race_constructs_once() {
   static CALLS: AtomicUsize = AtomicUsize::new(0);

   let singleton: Singleton<Vec<u64>> = Singleton::new(|| {
      CALLS.fetch_add(1, Ordering::SeqCst);
      // Widen the race window so the losers really contend.
      thread::sleep(Duration::from_millis(20));
      (0..8).collect()
   });

   let mut addresses = Vec::with_capacity(100);
   thread::scope(|s| {
      let handles: Vec<_> = (0..100)
         .map(|_| s.spawn(|| singleton.instance() as *const Vec<u64> as usize))
         .collect();
      for handle in handles {
         addresses.push(handle.join().unwrap());
      }
   });

   assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
   assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn deref_constructs_and_reads() {
   let singleton: Singleton<Vec<&'static str>> = Singleton::new(|| vec!["core"]);
   assert_eq!(singleton.len(), 1);
   assert_eq!(singleton.instance()[0], "core");
   assert!(singleton.is_ready());
}

#[test]
fn reset_allows_reconstruction() {
   static CALLS: AtomicUsize = AtomicUsize::new(0);

   let mut singleton: Singleton<u32> = Singleton::new(|| {
      CALLS.fetch_add(1, Ordering::SeqCst);
      11
   });
   assert_eq!(*singleton.instance(), 11);
   assert_eq!(singleton.reset(), Some(11));
   assert!(!singleton.is_ready());

   // A fresh access runs the constructor again.
   assert_eq!(*singleton.instance(), 11);
   assert_eq!(CALLS.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_construction_surfaces_and_retries() {
   static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

   fn flaky() -> Result<String, &'static str> {
      if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
         Err("first attempt fails")
      } else {
         Ok(String::from("recovered"))
      }
   }

   let singleton = TrySingleton::new(flaky);
   assert_eq!(
      singleton.instance(),
      Err(InitError::Construction("first attempt fails"))
   );
   assert!(!singleton.is_ready());

   assert_eq!(*singleton.instance().unwrap(), "recovered");
   assert!(singleton.is_ready());
   assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
}

#[test]
fn cached_instance_survives_breaking_the_constructor() {
   static RUNS: AtomicUsize = AtomicUsize::new(0);
   static BROKEN: AtomicBool = AtomicBool::new(false);

   fn switchable() -> Result<u64, &'static str> {
      RUNS.fetch_add(1, Ordering::SeqCst);
      if BROKEN.load(Ordering::SeqCst) {
         Err("constructor is now broken")
      } else {
         Ok(42)
      }
   }

   let singleton = TrySingleton::new(switchable);
   assert_eq!(singleton.instance(), Ok(&42));

   // Break the constructor. The cached instance must still come back and the
   // constructor must not run again.
   BROKEN.store(true, Ordering::SeqCst);
   assert_eq!(singleton.instance(), Ok(&42));
   assert_eq!(singleton.instance_for(Duration::from_millis(10)), Ok(&42));
   assert_eq!(RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn bounded_access_times_out_during_construction() {
   static ENTERED: AtomicBool = AtomicBool::new(false);
   static RELEASE: AtomicBool = AtomicBool::new(false);

   fn slow_build() -> Result<u32, &'static str> {
      ENTERED.store(true, Ordering::SeqCst);
      while !RELEASE.load(Ordering::SeqCst) {
         thread::sleep(Duration::from_millis(1));
      }
      Ok(7)
   }

   let singleton = TrySingleton::new(slow_build);
   thread::scope(|s| {
      s.spawn(|| {
         assert_eq!(singleton.instance(), Ok(&7));
      });

      while !ENTERED.load(Ordering::SeqCst) {
         thread::sleep(Duration::from_millis(1));
      }
      assert_eq!(
         singleton.instance_for(Duration::from_millis(30)),
         Err(InitError::TimedOut)
      );

      RELEASE.store(true, Ordering::SeqCst);
   });

   assert_eq!(singleton.instance_for(Duration::from_millis(100)), Ok(&7));
}

#[test]
fn error_formatting() {
   let construction: InitError<&str> = InitError::Construction("no database");
   assert_eq!(
      construction.to_string(),
      "singleton construction failed: no database"
   );

   let timeout: InitError<&str> = InitError::TimedOut;
   assert_eq!(
      timeout.to_string(),
      "timed out waiting for singleton construction"
   );
}
