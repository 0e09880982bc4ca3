use std::sync::atomic::{AtomicUsize, Ordering};

use once_singleton::Singleton;

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);
static DATA: Singleton<String> = Singleton::new(|| {
   // This runs on exactly one thread, no matter who gets here first.
   CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
   println!("Constructing the instance...");
   std::thread::sleep(std::time::Duration::from_millis(50));
   "Expensive data".to_string()
});

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("Thread access: {}", DATA.instance());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(DATA.get(), Some(&"Expensive data".to_string()));
   assert_eq!(CONSTRUCTED.load(Ordering::Relaxed), 1); // Constructor ran only once
   println!("Final data: {}", DATA.instance());
}
