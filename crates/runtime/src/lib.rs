use getsmart_core::{InterceptorConfig, ScriptInterceptor};
use std::sync::Arc;

/// Bootstraps an interceptor with the bundled minifier and compiler.
///
/// The JavaScript minifier is always registered; the CoffeeScript compiler is
/// registered for whatever alternate extension the config names.
pub fn build_default_interceptor(
    config: InterceptorConfig,
) -> getsmart_core::Result<Arc<ScriptInterceptor>> {
    let mut builder = ScriptInterceptor::builder(config.clone())
        .with_minifier(Arc::new(getsmart_js::JsMinifier::new()));

    if let Some(ext) = &config.alternate_extension {
        let compiler = getsmart_coffee::CommandCompiler::coffee().with_extension(ext);
        tracing::debug!("Alternate .{} sources compile with {}", ext, compiler.program());
        builder = builder.with_compiler(Arc::new(compiler));
    }

    Ok(Arc::new(builder.build()?))
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<impl Drop> {
    Some(getsmart_core::logging::init_logging(component, to_stderr))
}
