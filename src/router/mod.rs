// Router module - exact path lookup of configured routes

mod handler;

pub use handler::{
    RouteHandler, PARAM_HEIGHT, PARAM_LEFT, PARAM_OPACITY, PARAM_ROTATION, PARAM_TOP, PARAM_WIDTH,
};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;

pub struct Router {
    routes: HashMap<String, Arc<RouteHandler>>,
}

impl Router {
    pub fn new(config: &Config) -> Self {
        let mut routes = HashMap::new();
        for route in &config.routes {
            tracing::info!(
                path = %route.path,
                kind = ?route.kind,
                image = %route.image.display(),
                stamp = %route.stamp.display(),
                "Registered route"
            );
            let handler = RouteHandler::new(
                route.clone(),
                config.cache.clone(),
                config.images,
                config.debug,
            );
            routes.insert(route.path.clone(), Arc::new(handler));
        }
        Router { routes }
    }

    /// Handler registered for exactly this path
    pub fn route(&self, path: &str) -> Option<Arc<RouteHandler>> {
        self.routes.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
