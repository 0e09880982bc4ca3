use std::sync::atomic::{AtomicBool, Ordering};

use once_singleton::{InitError, TrySingleton};

static FAIL_NEXT: AtomicBool = AtomicBool::new(true);
static MAYBE_DATA: TrySingleton<String, &'static str> = TrySingleton::new(|| {
   println!("Attempting construction...");
   if FAIL_NEXT.load(Ordering::Relaxed) {
      Err("construction failed!")
   } else {
      Ok("Successfully constructed".to_string())
   }
});

fn main() {
   // First attempt fails; the cell stays unconstructed.
   match MAYBE_DATA.instance() {
      Ok(_) => panic!("should have failed"),
      Err(InitError::Construction(e)) => println!("Caught error: {e}"),
      Err(InitError::TimedOut) => unreachable!("no bounded wait here"),
   }
   assert!(!MAYBE_DATA.is_ready());

   // Second attempt succeeds.
   FAIL_NEXT.store(false, Ordering::Relaxed);
   match MAYBE_DATA.instance() {
      Ok(data) => println!("Got data: {data}"),
      Err(_) => panic!("should have succeeded"),
   }
   assert!(MAYBE_DATA.is_ready());

   // Breaking the constructor again changes nothing: success is cached.
   FAIL_NEXT.store(true, Ordering::Relaxed);
   match MAYBE_DATA.instance() {
      Ok(data) => println!("Got data again: {data}"),
      Err(_) => panic!("should have returned the cached instance"),
   }
}
