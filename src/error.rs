//! Error taxonomy for shader building, resource binding and the frame loop.

/// The shader stage an error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Errors produced by the GPU resource layer and the frame loop.
///
/// Construction-time errors ([`Compile`](RenderError::Compile),
/// [`Link`](RenderError::Link)) abort initialization of the affected object;
/// nothing of the failed object is retained. Lookup errors
/// ([`UnknownLocation`](RenderError::UnknownLocation),
/// [`UnknownUniformType`](RenderError::UnknownUniformType)) are programmer
/// errors that abort the calling operation rather than draw with stale
/// state. Per-frame errors propagate out of update/draw and halt the loop.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A shader stage failed to parse or validate. Carries the compiler
    /// diagnostic.
    #[error("could not compile {stage} shader: {diagnostic}")]
    Compile {
        stage: ShaderStage,
        diagnostic: String,
    },

    /// The two stages could not be combined into a usable program.
    #[error("could not link shader program: {0}")]
    Link(String),

    /// An attribute or uniform name was looked up that the linked program
    /// does not declare.
    #[error("unknown attribute or uniform name: '{0}'")]
    UnknownLocation(String),

    /// A uniform value's type does not match what the shader declares for
    /// that name.
    #[error("unknown uniform type for '{name}': {detail}")]
    UnknownUniformType { name: String, detail: String },

    /// Update or draw ran before one-time setup completed.
    #[error("not initialised")]
    NotInitialised,

    /// The presentation surface failed in a way reconfiguring cannot fix.
    #[error("surface error: {0}")]
    Surface(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
}
