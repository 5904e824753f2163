use std::sync::Arc;
use std::sync::Mutex;

use httpcheck::ServerHandler;
use httpcheck::ServerRequest;
use httpcheck::ServerResponse;

/// Handler which remembers the requests it got and answers with a
/// preset response.
pub struct RecordingHandler {
    requests: Mutex<Vec<ServerRequest>>,
    response: Mutex<ServerResponse>,
}

impl RecordingHandler {
    pub fn new() -> Arc<RecordingHandler> {
        RecordingHandler::with_response(ServerResponse::ok_200())
    }

    pub fn with_response(response: ServerResponse) -> Arc<RecordingHandler> {
        Arc::new(RecordingHandler {
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(response),
        })
    }

    pub fn set_response(&self, response: ServerResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ServerRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request received")
    }
}

impl ServerHandler for RecordingHandler {
    fn start_request(&self, req: ServerRequest) -> httpcheck::Result<ServerResponse> {
        debug!("recorded {} {}", req.method(), req.path());
        self.requests.lock().unwrap().push(req);
        Ok(self.response.lock().unwrap().clone())
    }
}
