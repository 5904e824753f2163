use std::collections::hash_map;
use std::collections::HashMap;
use std::sync::Arc;

use crate::server::handler::ServerHandler;
use crate::server::req::ServerRequest;
use crate::server::resp::ServerResponse;

#[derive(Default, Clone)]
struct Node {
    handler: Option<Arc<dyn ServerHandler>>,
    children: HashMap<String, Node>,
}

impl Node {
    fn add_handler(&mut self, path: &str, handler: Arc<dyn ServerHandler>) {
        match split_path(path) {
            None => {
                self.handler = Some(handler);
            }
            Some((first, rem)) => {
                let node = match self.children.entry(first.to_owned()) {
                    hash_map::Entry::Occupied(e) => e.into_mut(),
                    hash_map::Entry::Vacant(e) => e.insert(Node::default()),
                };
                node.add_handler(rem, handler);
            }
        }
    }

    fn remove_handler(&mut self, path: &str) -> Option<Arc<dyn ServerHandler>> {
        match split_path(path) {
            None => self.handler.take(),
            Some((first, rem)) => match self.children.get_mut(first) {
                Some(child) => child.remove_handler(rem),
                None => None,
            },
        }
    }

    fn find_handler(&self, path: &str) -> Option<&Arc<dyn ServerHandler>> {
        if let Some((first, rem)) = split_path(path) {
            if let Some(node) = self.children.get(first) {
                if let Some(handler) = node.find_handler(rem) {
                    return Some(handler);
                }
            }
        }

        self.handler.as_ref()
    }
}

fn split_path(mut path: &str) -> Option<(&str, &str)> {
    path = path.trim_start_matches('/');

    if path.is_empty() {
        None
    } else {
        match path.find('/') {
            Some(slash) => Some((&path[..slash], &path[slash + 1..])),
            None => Some((path, "")),
        }
    }
}

/// Path without the query string, used for routing.
fn route_path(path: &str) -> &str {
    match path.find('?') {
        Some(q) => &path[..q],
        None => path,
    }
}

/// Routes requests to handlers registered for path prefixes.
///
/// The handler registered for the longest matching prefix (by path
/// segment) wins; requests nothing matches are answered with `404`.
#[derive(Default, Clone)]
pub struct ServerHandlerPaths {
    root: Node,
}

impl ServerHandlerPaths {
    pub fn new() -> ServerHandlerPaths {
        Default::default()
    }

    /// Register a handler for the given path prefix, replacing any
    /// handler registered for the same prefix.
    pub fn set_handler(&mut self, path: &str, handler: Arc<dyn ServerHandler>) {
        assert!(path.starts_with('/'), "path must start with /: {}", path);
        self.root.add_handler(path, handler);
    }

    pub fn set_handler_fn<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(ServerRequest) -> crate::Result<ServerResponse> + Send + Sync + 'static,
    {
        self.set_handler(path, Arc::new(handler))
    }

    pub fn remove_handler(&mut self, path: &str) -> Option<Arc<dyn ServerHandler>> {
        assert!(path.starts_with('/'), "path must start with /: {}", path);
        self.root.remove_handler(path)
    }

    /// Remove all handlers.
    pub fn clear(&mut self) {
        self.root = Node::default();
    }

    /// Handler for a request target (query string is ignored).
    pub fn find_handler(&self, path: &str) -> Option<Arc<dyn ServerHandler>> {
        self.root.find_handler(route_path(path)).cloned()
    }
}

impl ServerHandler for ServerHandlerPaths {
    fn start_request(&self, req: ServerRequest) -> crate::Result<ServerResponse> {
        match self.find_handler(req.path()) {
            Some(handler) => {
                debug!("invoking handler for path {}", req.path());
                handler.start_request(req)
            }
            None => {
                debug!("serving 404 for path {}", req.path());
                Ok(ServerResponse::not_found_404())
            }
        }
    }
}
