use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("canvasWidth is required")]
    MissingWidth,
    #[error("canvasHeight is required")]
    MissingHeight,
    #[error("canvas is required")]
    MissingCanvas,
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("DOM call failed: {0}")]
    Dom(String),
    #[error("a scene is already running; only one event loop can exist per page")]
    EventLoopInUse,
}
