//! Earth Engine expression graphs.
//!
//! The REST API takes computations as an `Expression`: a map of value nodes
//! plus the key of the result node. Nodes are constants, arrays,
//! dictionaries or function invocations whose arguments are nodes again.
//! This module builds the graph for an annual mean aggregation directly as
//! JSON.

use serde_json::{Map, Value, json};

use simsearch_types::embedding::AnnualMeanRecipe;
use simsearch_types::plot::{PlotDataset, PlotRecord};

pub fn constant(value: impl Into<Value>) -> Value {
    json!({ "constantValue": value.into() })
}

pub fn invoke(function_name: &str, arguments: Vec<(&str, Value)>) -> Value {
    let arguments: Map<String, Value> = arguments
        .into_iter()
        .map(|(name, node)| (name.to_string(), node))
        .collect();
    json!({
        "functionInvocationValue": {
            "functionName": function_name,
            "arguments": arguments,
        }
    })
}

fn array(values: Vec<Value>) -> Value {
    json!({ "arrayValue": { "values": values } })
}

/// Wrap a value node as a complete single-node expression.
pub fn expression(root: Value) -> Value {
    json!({
        "result": "0",
        "values": { "0": root },
    })
}

/// Point feature at the plot centre carrying the plot attributes.
fn plot_feature(plot: &PlotRecord) -> Value {
    let point = invoke(
        "GeometryConstructors.Point",
        vec![("coordinates", constant(json!([plot.center_lon, plot.center_lat])))],
    );
    invoke(
        "Feature",
        vec![
            ("geometry", point),
            (
                "metadata",
                constant(json!({
                    "plotid": plot.plotid,
                    "center_lon": plot.center_lon,
                    "center_lat": plot.center_lat,
                    "size_m": plot.size_m,
                })),
            ),
        ],
    )
}

/// Feature collection with one point per plot.
pub fn plot_collection(plots: &PlotDataset) -> Value {
    let features = plots.records().iter().map(plot_feature).collect();
    invoke("Collection", vec![("features", array(features))])
}

/// Annual mosaic of the embedding collection reduced to per-plot means.
pub fn annual_mean(plots: &PlotDataset, recipe: &AnnualMeanRecipe) -> Value {
    let collection = invoke(
        "ImageCollection.load",
        vec![("id", constant(recipe.collection.as_str()))],
    );
    let year_filter = invoke(
        "Filter.calendarRange",
        vec![
            ("start", constant(recipe.year)),
            ("end", constant(recipe.year)),
            ("field", constant("year")),
        ],
    );
    let filtered = invoke(
        "Collection.filter",
        vec![("collection", collection), ("filter", year_filter)],
    );
    let mosaic = invoke("ImageCollection.mosaic", vec![("collection", filtered)]);
    let projection = invoke("Projection", vec![("crs", constant(recipe.crs.as_str()))]);

    invoke(
        "Image.reduceRegions",
        vec![
            ("image", mosaic),
            ("collection", plot_collection(plots)),
            ("reducer", invoke("Reducer.mean", Vec::new())),
            ("scale", constant(recipe.scale_m)),
            ("crs", projection),
            ("tileScale", constant(recipe.tile_scale)),
            ("maxPixelsPerRegion", constant(recipe.max_pixels_per_region)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use simsearch_types::embedding::EMBEDDING_COLLECTION;

    fn plots() -> PlotDataset {
        PlotDataset::new(vec![
            PlotRecord { plotid: 1, center_lon: 10.5, center_lat: -2.25, size_m: 30 },
            PlotRecord { plotid: 2, center_lon: 10.6, center_lat: -2.3, size_m: 30 },
        ])
        .unwrap()
    }

    fn args<'a>(node: &'a Value) -> &'a Value {
        &node["functionInvocationValue"]["arguments"]
    }

    #[test]
    fn test_annual_mean_graph() {
        let recipe = AnnualMeanRecipe::new(2021, 30);
        let node = annual_mean(&plots(), &recipe);

        assert_eq!(node["functionInvocationValue"]["functionName"], "Image.reduceRegions");
        let a = args(&node);
        assert_eq!(a["scale"]["constantValue"], 30);
        assert_eq!(a["tileScale"]["constantValue"], 16);
        assert_eq!(a["crs"]["functionInvocationValue"]["functionName"], "Projection");
        assert_eq!(args(&a["crs"])["crs"]["constantValue"], "EPSG:4326");
        assert_eq!(a["reducer"]["functionInvocationValue"]["functionName"], "Reducer.mean");

        let mosaic = &a["image"];
        assert_eq!(mosaic["functionInvocationValue"]["functionName"], "ImageCollection.mosaic");
        let filtered = &args(mosaic)["collection"];
        let filter = &args(filtered)["filter"];
        assert_eq!(args(filter)["start"]["constantValue"], 2021);
        assert_eq!(args(filter)["end"]["constantValue"], 2021);
        let load = &args(filtered)["collection"];
        assert_eq!(args(load)["id"]["constantValue"], EMBEDDING_COLLECTION);
    }

    #[test]
    fn test_plot_collection_carries_attributes() {
        let node = plot_collection(&plots());
        let features = args(&node)["features"]["arrayValue"]["values"]
            .as_array()
            .unwrap();
        assert_eq!(features.len(), 2);

        let first = args(&features[0]);
        assert_eq!(first["metadata"]["constantValue"]["plotid"], 1);
        assert_eq!(first["metadata"]["constantValue"]["size_m"], 30);
        assert_eq!(
            args(&first["geometry"])["coordinates"]["constantValue"],
            json!([10.5, -2.25])
        );
    }

    #[test]
    fn test_expression_wraps_root() {
        let e = expression(constant(1));
        assert_eq!(e["result"], "0");
        assert_eq!(e["values"]["0"]["constantValue"], 1);
    }
}
