//! Marker-cluster world map rendered with Leaflet.

use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::charts::{escape_html, script_json};
use crate::error::Result;

pub const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
pub const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
pub const CLUSTER_CSS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css";
pub const CLUSTER_BASE_CSS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css";
pub const CLUSTER_JS: &str =
    "https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js";
const TILES: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    #[serde(rename = "ESG-term")]
    pub esg_term: String,
    pub link: String,
}

impl MapMarker {
    fn popup(&self) -> String {
        let link = escape_html(&self.link);
        format!(
            "Country : {}<br>ESG-term : {}<br>Link : <a href=\"{link}\" target=\"_blank\">{link}</a>",
            escape_html(&self.country),
            escape_html(&self.esg_term),
        )
    }
}

/// Reads `latitude,longitude,country,ESG-term,link` rows.
pub fn read_markers(path: &Path) -> Result<Vec<MapMarker>> {
    let mut rdr = ReaderBuilder::new().from_path(path)?;
    let mut markers = Vec::new();
    for row in rdr.deserialize() {
        markers.push(row?);
    }
    Ok(markers)
}

/// `<link>`/`<script>` tags Leaflet and the cluster plugin need.
pub fn head_includes() -> String {
    format!(
        "<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\">\n<link rel=\"stylesheet\" href=\"{CLUSTER_BASE_CSS}\">\n<link rel=\"stylesheet\" href=\"{CLUSTER_CSS}\">\n<script src=\"{LEAFLET_JS}\"></script>\n<script src=\"{CLUSTER_JS}\"></script>\n"
    )
}

/// A map `<div>` with one circle marker per row, grouped in a marker cluster.
pub fn cluster_map(markers: &[MapMarker], id: &str) -> Result<String> {
    let points: Vec<_> = markers
        .iter()
        .map(|m| json!({ "lat": m.latitude, "lon": m.longitude, "popup": m.popup() }))
        .collect();
    let points = script_json(&serde_json::to_string(&points)?);
    let id = escape_html(id);
    Ok(format!(
        r#"<div id="{id}" class="map" style="height: 700px;"></div>
<script>
(function () {{
  var map = L.map("{id}").setView([20, 0], 2);
  L.tileLayer("{TILES}", {{
    attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
    subdomains: "abcd",
    maxZoom: 19
  }}).addTo(map);
  var cluster = L.markerClusterGroup();
  {points}.forEach(function (p) {{
    L.circleMarker([p.lat, p.lon], {{ radius: 5, fill: true }}).bindPopup(p.popup).addTo(cluster);
  }});
  cluster.addTo(map);
}})();
</script>
"#
    ))
}

/// A standalone HTML page with the map.
pub fn map_html(markers: &[MapMarker], title: &str) -> Result<String> {
    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n{}</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        head_includes(),
        cluster_map(markers, "map")?
    ))
}
