//! Rendering of category totals into a self-contained chart document.
use bytes::Bytes;
use charming::{
    component::{Legend, Title},
    element::{Tooltip, Trigger},
    series::Pie,
    Chart,
};

use crate::reports::breakdown::CategoryTotal;

/// A rendered chart and the media type to serve it with.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub content_type: &'static str,
    pub body: Bytes,
}

pub trait ChartRenderer: Send + Sync {
    fn render(&self, title: &str, slices: &[CategoryTotal]) -> anyhow::Result<RenderedChart>;
}

/// Pie chart as an ECharts option document.
#[derive(Debug, Clone, Copy, Default)]
pub struct EChartsRenderer;

impl EChartsRenderer {
    pub fn pie_chart(title: &str, slices: &[CategoryTotal]) -> Chart {
        let data: Vec<(f64, &str)> = slices
            .iter()
            .map(|slice| (slice.value as f64, slice.label.as_str()))
            .collect();

        Chart::new()
            .title(Title::new().text(title).left("center"))
            .tooltip(Tooltip::new().trigger(Trigger::Item))
            .legend(Legend::new().left("left"))
            .series(Pie::new().name("Expenses").radius("50%").data(data))
    }
}

impl ChartRenderer for EChartsRenderer {
    fn render(&self, title: &str, slices: &[CategoryTotal]) -> anyhow::Result<RenderedChart> {
        let document = Self::pie_chart(title, slices).to_string();
        Ok(RenderedChart {
            content_type: "application/json",
            body: Bytes::from(document),
        })
    }
}
