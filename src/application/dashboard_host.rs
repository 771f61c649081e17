// Collaborators the dashboard engine drives: the chart renderer and canvas
use crate::domain::chart::DrawRequest;
use crate::domain::dashboard::VisualElement;
use async_trait::async_trait;

#[async_trait]
pub trait DashboardHost: Send + Sync {
    /// Render a resolved chart
    async fn draw_chart(&self, request: DrawRequest) -> anyhow::Result<()>;

    /// Instantiate a visual element on the canvas. Resolves once the element
    /// has finished its first render, so paint order follows call order.
    async fn place_element(&self, element: &VisualElement) -> anyhow::Result<()>;

    /// Remove a named element (chart or filter widget) from the canvas
    async fn remove_element(&self, name: &str) -> anyhow::Result<()>;

    /// Remove every element, ahead of a restore
    async fn clear_canvas(&self) -> anyhow::Result<()>;

    /// Open the editor for a freshly created chart
    async fn edit_chart(&self, name: &str) -> anyhow::Result<()>;

    /// Reposition and resize the dashboard container around its elements
    async fn fit_to_contents(&self) -> anyhow::Result<()>;
}

/// Dependent-update hook, called after every mutating store operation.
pub trait UpdateListener: Send + Sync {
    fn update(&self);
}
