#![cfg_attr(all(test, not(target_arch = "wasm32")), allow(dead_code))]

mod contributions;

#[cfg(any(target_arch = "wasm32", test))]
mod calendar;
#[cfg(any(target_arch = "wasm32", test))]
mod config;
#[cfg(any(target_arch = "wasm32", test))]
mod device;
#[cfg(any(target_arch = "wasm32", test))]
mod motion;
#[cfg(any(target_arch = "wasm32", test))]
mod nav;
#[cfg(any(target_arch = "wasm32", test))]
mod particles;
#[cfg(any(target_arch = "wasm32", test))]
mod typer;

#[cfg(not(target_arch = "wasm32"))]
mod backend;
#[cfg(target_arch = "wasm32")]
mod frontend;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() {
    if let Err(error) = backend::run().await {
        eprintln!("server failed: {error}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    frontend::run();
}
