//! # Registro de Rutas
//! src/router/mod.rs
//!
//! Tabla ordenada de rutas dinámicas que se consulta antes del sistema de
//! archivos.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router ─ Handler          → Response
//!                  ├ MethodNotAllowed → 405 (el disco no se consulta)
//!                  └ NoRoute          → archivos estáticos
//! ```
//!
//! El match es por igualdad exacta de path, en orden de registro; gana la
//! primera ruta cuyo path coincide. Se arma una vez al arrancar y después
//! solo se lee, sin locks.

use crate::http::{Method, Request, Response};

/// Capacidad de atender un request
///
/// Un handler recibe un Request y retorna una Response
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// Ruta registrada
pub struct Route {
    path: String,
    methods: Vec<Method>,
    handler: Handler,
}

impl Route {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }
}

/// Resultado de buscar una ruta
pub enum RouteMatch<'a> {
    /// Path y método coinciden
    Handler(&'a Handler),

    /// El path existe pero no acepta ese método
    MethodNotAllowed,

    /// Ningún path coincide: le toca al sistema de archivos
    NoRoute,
}

/// Router que mapea paths exactos a handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta con sus métodos permitidos
    ///
    /// # Ejemplo
    /// ```
    /// use origin_server::router::Router;
    /// use origin_server::http::{Method, Request, Response};
    ///
    /// let mut router = Router::new();
    /// router.register("/hello", &[Method::GET, Method::HEAD], |_req: &Request| {
    ///     Response::text("hello")
    /// });
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register<F>(&mut self, path: &str, methods: &[Method], handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            path: path.to_string(),
            methods: methods.to_vec(),
            handler: Box::new(handler),
        });
    }

    /// Busca la ruta para `(path, method)`
    pub fn find(&self, path: &str, method: Method) -> RouteMatch<'_> {
        match self.routes.iter().find(|route| route.path == path) {
            Some(route) if route.allows(method) => RouteMatch::Handler(&route.handler),
            Some(_) => RouteMatch::MethodNotAllowed,
            None => RouteMatch::NoRoute,
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
