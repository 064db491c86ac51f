//! The request pipeline behind [`Schmock::handle`].
//!
//! [`Schmock::handle`]: crate::Schmock::handle
use crate::events::{Event, EventBus};
use crate::plugin::{ErrorOutcome, Plugin};
use crate::request::{
    split_query, BodyPrintLimit, RequestContext, RequestOptions, ResponseContext, State, Store,
};
use crate::route_table::{CompiledRoute, Responder, RouteMatch, RouteTable};
use crate::{Response, SchmockError};
use http::{Method, StatusCode};
use log::{debug, warn};
use serde_json::Value;

/// Everything one mock instance needs to answer a request. Built once, read-only afterwards.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    pub(crate) routes: RouteTable,
    /// Already in execution order.
    pub(crate) plugins: Vec<Plugin>,
    pub(crate) events: EventBus,
    pub(crate) state: State,
    pub(crate) body_print_limit: BodyPrintLimit,
}

/// The outcome of a dispatch: the response and the request it answered.
///
/// `request` is the context as it was before any plugin ran, with the matched route and
/// its params filled in.
#[derive(Debug)]
pub(crate) struct Dispatched {
    pub(crate) request: RequestContext,
    pub(crate) response: Response,
}

impl Dispatcher {
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        path: &str,
        mut options: RequestOptions,
    ) -> Dispatched {
        let (path, mut query) = split_query(path);
        // Explicit query parameters win over the ones embedded in the path.
        query.extend(options.query);
        options.query = query;

        self.events.emit(&Event::RequestStart {
            method: method.clone(),
            path: path.to_string(),
        });
        let mut request = RequestContext::new(
            method.clone(),
            path.to_string(),
            options,
            self.state.clone(),
            self.body_print_limit,
        );
        debug!("Handling request.\n{}", request);

        let Some(RouteMatch { route, params }) = self.routes.match_route(&method, path) else {
            debug!("Got unexpected request:\n{}", request);
            let error = SchmockError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            };
            let response = Response::from_error(StatusCode::NOT_FOUND, &error);
            self.emit_error(&request, error);
            return self.finish(request, response);
        };
        debug!("Matched route {}", route.key());

        let error_context = RequestContext {
            store: Store::default(),
            ..request.clone()
        };
        request.route = Some(route.clone());
        request.params = params;

        let response = match self.run_pipeline(&route, request.clone()).await {
            Ok(response) => response,
            Err(error) => self.recover(error, error_context).await,
        };
        self.finish(request, response)
    }

    fn finish(&self, request: RequestContext, response: Response) -> Dispatched {
        self.events.emit(&Event::RequestEnd {
            method: request.method.clone(),
            path: request.path.clone(),
            status: response.status,
        });
        Dispatched { request, response }
    }

    fn emit_error(&self, request: &RequestContext, error: SchmockError) {
        self.events.emit(&Event::Error {
            method: request.method.clone(),
            path: request.path.clone(),
            error,
        });
    }

    async fn run_pipeline(
        &self,
        route: &CompiledRoute,
        mut context: RequestContext,
    ) -> Result<Response, SchmockError> {
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.before_request {
                context = hook(context)
                    .await
                    .map_err(|e| SchmockError::plugin(plugin.name(), e))?;
            }
        }

        let mut early_payload = None;
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.before_generate {
                early_payload = hook(context.clone())
                    .await
                    .map_err(|e| SchmockError::plugin(plugin.name(), e))?;
                if early_payload.is_some() {
                    debug!("Plugin {} short-circuited generation", plugin.name());
                    break;
                }
            }
        }

        let mut payload = match early_payload {
            Some(payload) => payload,
            None => self.generate(route, &context).await?,
        };

        for plugin in &self.plugins {
            if let Some(hook) = &plugin.after_generate {
                payload = hook(payload, context.clone())
                    .await
                    .map_err(|e| SchmockError::plugin(plugin.name(), e))?;
            }
        }

        let mut response = normalize(route, payload)?;

        for plugin in &self.plugins {
            if let Some(hook) = &plugin.before_response {
                response = hook(response, context.clone())
                    .await
                    .map_err(|e| SchmockError::plugin(plugin.name(), e))?;
            }
        }

        Ok(response)
    }

    async fn generate(
        &self,
        route: &CompiledRoute,
        context: &RequestContext,
    ) -> Result<Value, SchmockError> {
        let fail = |reason: String| SchmockError::ResponseGeneration {
            route: route.key().to_string(),
            reason,
        };

        match &route.responder {
            Some(Responder::Value(value)) => Ok(value.clone()),
            Some(Responder::Handler(handler)) => handler(ResponseContext::from(context))
                .await
                .map_err(|e| fail(e.to_string())),
            None => {
                for plugin in &self.plugins {
                    if let Some(hook) = &plugin.generate {
                        let generated = hook(context.clone())
                            .await
                            .map_err(|e| SchmockError::plugin(plugin.name(), e))?;
                        if let Some(payload) = generated {
                            debug!("Plugin {} generated the payload", plugin.name());
                            return Ok(payload);
                        }
                    }
                }
                Err(fail("no plugin generated a payload".into()))
            }
        }
    }

    /// Give every `on_error` hook a chance to turn `error` into a response.
    async fn recover(&self, mut error: SchmockError, context: RequestContext) -> Response {
        debug!("Request failed: {}", error);
        let mut recovered = None;

        for plugin in &self.plugins {
            let Some(hook) = &plugin.on_error else {
                continue;
            };
            match hook(error.clone(), context.clone()).await {
                Ok(ErrorOutcome::Respond(response)) => {
                    debug!("Plugin {} recovered from the error", plugin.name());
                    recovered = Some(response);
                    break;
                }
                Ok(ErrorOutcome::Replace(replacement)) => error = replacement,
                Ok(ErrorOutcome::Pass) => {}
                Err(e) => error = SchmockError::plugin(plugin.name(), e),
            }
        }

        let response = recovered.unwrap_or_else(|| {
            warn!(
                "Unrecovered error for {} {}: {}",
                context.method, context.path, error
            );
            Response::from_error(StatusCode::INTERNAL_SERVER_ERROR, &error)
        });
        self.emit_error(&context, error);
        response
    }
}

/// Turn the payload into a response and apply the route's content type.
fn normalize(route: &CompiledRoute, payload: Value) -> Result<Response, SchmockError> {
    let mut response =
        Response::from_payload(payload).map_err(|reason| SchmockError::ResponseGeneration {
            route: route.key().to_string(),
            reason,
        })?;

    if let Some(content_type) = &route.config.content_type {
        let has_content_type = response
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            response
                .headers
                .insert("content-type".to_string(), content_type.clone());
        }
    }
    Ok(response)
}
