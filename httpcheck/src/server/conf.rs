/// Server configuration.
#[derive(Default, Debug, Clone)]
pub struct ServerConf {
    /// TCP_NODELAY for accepted connections.
    pub no_delay: Option<bool>,

    /// Bind on both IPv4 and IPv6 addresses when addr is IPv6.
    pub only_v6: Option<bool>,

    /// Ignored on Windows.
    pub reuse_port: Option<bool>,

    /// Socket option.
    pub backlog: Option<i32>,
}

impl ServerConf {
    pub fn new() -> ServerConf {
        Default::default()
    }
}
