use axum::response::Html;

const LANDING: &str = concat!(
    "<html>\n",
    "<head><title>Odyssey Exporter</title></head>\n",
    "<body>\n",
    "<h1>Odyssey Exporter</h1>\n",
    "<p>",
    env!("CARGO_PKG_NAME"),
    " ",
    env!("CARGO_PKG_VERSION"),
    "</p>\n",
    "<p><a href=\"/metrics\">Metrics</a></p>\n",
    "<p><a href=\"/health\">Health</a></p>\n",
    "</body>\n",
    "</html>\n",
);

pub async fn landing() -> Html<&'static str> {
    Html(LANDING)
}
