use crate::error::AppError;
use crate::utils::JwtService;
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

// Paths reachable without a token.
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    excluded_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/swagger-ui",
                "/swagger-ui/",
                "/api-docs/openapi.json",
                "/api/v1/utm/track",
            ],
            prefix_paths: vec![
                "/swagger-ui/",
                "/api-docs/",
                "/api/v1/auth/",
                "/api/v1/catalog/",
                "/api/v1/cart/",
                "/api/v1/promo/",
                "/webhook/",
            ],
            // Paths under a public prefix that still require a token.
            excluded_paths: vec!["/api/v1/auth/me"],
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|&excluded| path.starts_with(excluded))
        {
            return false;
        }

        if self.exact_paths.contains(&path) {
            return true;
        }

        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }

    // Guest checkout: placing an order needs no account, but reading
    // orders back does.
    fn is_guest_allowed(&self, method: &Method, path: &str) -> bool {
        method == Method::POST && path == "/api/v1/orders"
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight always passes.
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let path = req.path().to_string();
        let optional = self.public_paths.is_public_path(&path)
            || self.public_paths.is_guest_allowed(req.method(), &path);

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::to_string);

        match token {
            Some(token) => match self.jwt_service.verify_access_token(&token) {
                Ok(claims) => {
                    req.extensions_mut()
                        .insert(claims.sub.parse::<i64>().unwrap_or(0));
                    req.extensions_mut().insert(claims.role);
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(_) if optional => {
                    // A stale token on a public route is ignored, the
                    // request proceeds anonymously.
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(_) => {
                    let error = AppError::AuthError("Invalid access token".to_string());
                    Box::pin(async move { Err(error.into()) })
                }
            },
            None if optional => {
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            None => {
                let error = AppError::AuthError("Missing access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_paths_are_public() {
        let paths = PublicPaths::new();
        assert!(paths.is_public_path("/api/v1/auth/login"));
        assert!(paths.is_public_path("/api/v1/catalog/products"));
        assert!(paths.is_public_path("/api/v1/cart/quote"));
        assert!(paths.is_public_path("/api/v1/promo/SAVE10"));
        assert!(paths.is_public_path("/api/v1/utm/track"));
        assert!(paths.is_public_path("/webhook/monobank"));
    }

    #[test]
    fn test_protected_paths_need_a_token() {
        let paths = PublicPaths::new();
        assert!(!paths.is_public_path("/api/v1/survey/session"));
        assert!(!paths.is_public_path("/api/v1/orders"));
        assert!(!paths.is_public_path("/api/v1/dropship/orders"));
        assert!(!paths.is_public_path("/api/v1/utm/stats"));
        assert!(!paths.is_public_path("/api/v1/auth/me"));
    }

    #[test]
    fn test_guest_checkout_is_post_only() {
        let paths = PublicPaths::new();
        assert!(paths.is_guest_allowed(&Method::POST, "/api/v1/orders"));
        assert!(!paths.is_guest_allowed(&Method::GET, "/api/v1/orders"));
        assert!(!paths.is_guest_allowed(&Method::POST, "/api/v1/orders/1/status"));
    }
}
