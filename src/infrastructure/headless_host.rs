// Headless dashboard host - keeps the latest rendering of every chart
use crate::application::dashboard_host::{DashboardHost, UpdateListener};
use crate::domain::chart::DrawRequest;
use crate::domain::dashboard::VisualElement;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Stands in for a browser canvas: draw requests are kept per chart so
/// clients can fetch the data a chart would show, and placed elements are
/// kept in paint order. Store updates bump a revision clients can poll.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    rendered: RwLock<HashMap<String, DrawRequest>>,
    placed: RwLock<Vec<VisualElement>>,
    revision: AtomicU64,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rendered(&self, chart_name: &str) -> Option<DrawRequest> {
        self.rendered.read().await.get(chart_name).cloned()
    }

    pub async fn placed(&self) -> Vec<VisualElement> {
        self.placed.read().await.clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

impl UpdateListener for HeadlessHost {
    fn update(&self) {
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!("Dashboard updated to revision {}", revision);
    }
}

fn element_name(element: &VisualElement) -> Option<&str> {
    match element {
        VisualElement::Chart { name, .. } | VisualElement::FilterWidget { name, .. } => Some(name),
        VisualElement::Free { .. } => None,
    }
}

#[async_trait]
impl DashboardHost for HeadlessHost {
    async fn draw_chart(&self, request: DrawRequest) -> Result<()> {
        tracing::debug!(
            "Rendered chart {} ({}) with {} rows",
            request.chart_name,
            request.chart_type,
            request.data.rows.len()
        );
        self.rendered
            .write()
            .await
            .insert(request.chart_name.clone(), request);
        Ok(())
    }

    async fn place_element(&self, element: &VisualElement) -> Result<()> {
        let mut placed = self.placed.write().await;
        // re-adding a named element brings it to the front
        if let Some(name) = element_name(element) {
            placed.retain(|p| element_name(p) != Some(name));
        }
        placed.push(element.clone());
        Ok(())
    }

    async fn remove_element(&self, name: &str) -> Result<()> {
        self.placed
            .write()
            .await
            .retain(|p| element_name(p) != Some(name));
        self.rendered.write().await.remove(name);
        Ok(())
    }

    async fn clear_canvas(&self) -> Result<()> {
        self.placed.write().await.clear();
        self.rendered.write().await.clear();
        Ok(())
    }

    async fn edit_chart(&self, name: &str) -> Result<()> {
        tracing::info!("Chart {} created; no editor attached", name);
        Ok(())
    }

    async fn fit_to_contents(&self) -> Result<()> {
        let mut placed = self.placed.write().await;
        placed.sort_by_key(VisualElement::morph_index);
        tracing::debug!("Dashboard holds {} elements", placed.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::ResolvedData;
    use serde_json::Map;

    fn chart(name: &str, morph_index: u64) -> VisualElement {
        VisualElement::Chart {
            name: name.to_string(),
            chart_type: "PieChart".to_string(),
            morph_index,
        }
    }

    #[tokio::test]
    async fn test_keeps_latest_draw() {
        let host = HeadlessHost::new();
        for rows in [1usize, 2] {
            let request = DrawRequest {
                chart_name: "pie".to_string(),
                chart_type: "PieChart".to_string(),
                options: Map::new(),
                data: ResolvedData {
                    name: "sales".to_string(),
                    columns: Vec::new(),
                    rows: vec![Vec::new(); rows],
                    active_filters: Vec::new(),
                },
            };
            host.draw_chart(request).await.unwrap();
        }
        assert_eq!(host.rendered("pie").await.unwrap().data.rows.len(), 2);
        assert!(host.rendered("bars").await.is_none());
    }

    #[tokio::test]
    async fn test_placement_order() {
        let host = HeadlessHost::new();
        host.place_element(&chart("b", 1)).await.unwrap();
        host.place_element(&chart("a", 0)).await.unwrap();
        host.place_element(&chart("b", 2)).await.unwrap();

        let indices: Vec<u64> = host.placed().await.iter().map(VisualElement::morph_index).collect();
        assert_eq!(indices, vec![0, 2]);

        host.fit_to_contents().await.unwrap();
        assert_eq!(host.placed().await[0], chart("a", 0));

        host.remove_element("a").await.unwrap();
        assert_eq!(host.placed().await, vec![chart("b", 2)]);
        host.clear_canvas().await.unwrap();
        assert!(host.placed().await.is_empty());
    }

    #[test]
    fn test_updates_bump_revision() {
        let host = HeadlessHost::new();
        host.update();
        host.update();
        assert_eq!(host.revision(), 2);
    }
}
