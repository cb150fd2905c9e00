//! Default Upper Colorado basin site list.

pub const DISCHARGE: &str = "00060";
pub const GAGE_HEIGHT: &str = "00065";
pub const LAKE_ELEVATION: &str = "62614";

pub const PARAMETERS: [(&str, &str); 3] = [
    (DISCHARGE, "Discharge, cubic feet per second"),
    (GAGE_HEIGHT, "Gage height, feet"),
    (LAKE_ELEVATION, "Lake or reservoir water surface elevation above NGVD 1929, feet"),
];

pub const RIVER_SITES: [(&str, &str); 14] = [
    ("09152500", "Gunnison River near Grand Junction, CO"),
    ("09095500", "Colorado River near Cameo, CO"),
    ("09106150", "Colorado River below Grand Valley Div nr Palisade, CO"),
    ("09106485", "Colorado River above Gunnison River at Grand Junction, CO"),
    ("09163500", "Colorado River near Colorado-Utah State Line"),
    ("09306500", "White River near Watson, UT"),
    ("09251000", "Yampa River near Maybell, CO"),
    ("09260050", "Yampa River at Deerlodge Park, CO"),
    ("09260000", "Little Snake River near Lily, CO"),
    ("09261000", "Green River near Jensen, UT"),
    ("09315000", "Green River at Green River, UT"),
    ("09302000", "Duchesne River near Randlett, UT"),
    ("09180000", "Dolores River near Cisco, UT"),
    ("09328960", "Colorado River at Gypsum Canyon near Hite, UT"),
];

pub const RESERVOIR_SITES: [(&str, &str); 3] = [
    ("09147022", "Ridgway Reservoir near Ridgway, CO"),
    ("09041395", "Wolford Mtn Reservoir nr Kremmling, CO"),
    ("09379900", "Lake Powell at Glen Canyon Dam, AZ"),
];
