use std::future::Future;

#[allow(dead_code)]
pub fn assert_send<T: Send>() {}
#[allow(dead_code)]
pub fn assert_sync<T: Sync>() {}

#[allow(dead_code)]
pub fn assert_send_future<O, F: Future<Output = O> + Send>(f: F) -> F {
    f
}
