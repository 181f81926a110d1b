use serde::{Deserialize, Serialize};

use crate::lanes::{LaneId, RegionOfInterest};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum VehicleCategory {
    Car,
    Motorcycle,
    Bus,
    Truck,
    Bicycle,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 5] = [
        VehicleCategory::Car,
        VehicleCategory::Motorcycle,
        VehicleCategory::Bus,
        VehicleCategory::Truck,
        VehicleCategory::Bicycle,
    ];

    /// COCO class ids as emitted by YOLO-family detectors. Non-vehicle
    /// classes map to `None`.
    pub fn from_coco_class(class_id: u32) -> Option<Self> {
        match class_id {
            1 => Some(VehicleCategory::Bicycle),
            2 => Some(VehicleCategory::Car),
            3 => Some(VehicleCategory::Motorcycle),
            5 => Some(VehicleCategory::Bus),
            7 => Some(VehicleCategory::Truck),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::Car => "car",
            VehicleCategory::Motorcycle => "motorcycle",
            VehicleCategory::Bus => "bus",
            VehicleCategory::Truck => "truck",
            VehicleCategory::Bicycle => "bicycle",
        }
    }
}

/// Per-category vehicle tally. Every category is always present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct VehicleCounts {
    pub car: u32,
    pub motorcycle: u32,
    pub bus: u32,
    pub truck: u32,
    pub bicycle: u32,
}

impl VehicleCounts {
    pub fn get(&self, category: VehicleCategory) -> u32 {
        match category {
            VehicleCategory::Car => self.car,
            VehicleCategory::Motorcycle => self.motorcycle,
            VehicleCategory::Bus => self.bus,
            VehicleCategory::Truck => self.truck,
            VehicleCategory::Bicycle => self.bicycle,
        }
    }

    pub fn add(&mut self, category: VehicleCategory, count: u32) {
        let slot = match category {
            VehicleCategory::Car => &mut self.car,
            VehicleCategory::Motorcycle => &mut self.motorcycle,
            VehicleCategory::Bus => &mut self.bus,
            VehicleCategory::Truck => &mut self.truck,
            VehicleCategory::Bicycle => &mut self.bicycle,
        };
        *slot = slot.saturating_add(count);
    }

    pub fn with(mut self, category: VehicleCategory, count: u32) -> Self {
        self.add(category, count);
        self
    }

    /// Bicycles weigh the same as any other vehicle.
    pub fn total(&self) -> u64 {
        VehicleCategory::ALL
            .iter()
            .map(|category| self.get(*category) as u64)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }
}

/// Detector hits scored below this are not counted.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;

/// One raw detector hit, before category mapping and ROI filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySample {
    pub lane_id: LaneId,
    pub counts_by_category: VehicleCounts,
    /// Display only; the green-time policy never reads these.
    pub bounding_boxes: Vec<BoundingBox>,
}

impl OccupancySample {
    pub fn new(lane_id: LaneId, counts_by_category: VehicleCounts) -> Self {
        Self {
            lane_id,
            counts_by_category,
            bounding_boxes: Vec::new(),
        }
    }

    /// All-zero sample used when the detector cannot answer.
    pub fn empty(lane_id: LaneId) -> Self {
        Self::new(lane_id, VehicleCounts::default())
    }

    /// Tallies vehicle-class detections scored at least `min_confidence`
    /// whose box centre falls inside `region`.
    pub fn from_detections<'a>(
        lane_id: LaneId,
        region: &RegionOfInterest,
        min_confidence: f32,
        detections: impl IntoIterator<Item = &'a Detection>,
    ) -> Self {
        let mut sample = Self::empty(lane_id);

        for detection in detections {
            if detection.confidence.is_nan() || detection.confidence < min_confidence {
                continue;
            }
            let Some(category) = VehicleCategory::from_coco_class(detection.class_id) else {
                continue;
            };
            let (cx, cy) = detection.bbox.center();
            if !region.contains(cx, cy) {
                continue;
            }
            sample.counts_by_category.add(category, 1);
            sample.bounding_boxes.push(detection.bbox);
        }

        sample
    }

    pub fn total_vehicles(&self) -> u64 {
        self.counts_by_category.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(class_id: u32, x: i32, y: i32) -> Detection {
        scored(class_id, x, y, 0.8)
    }

    fn scored(class_id: u32, x: i32, y: i32, confidence: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: BoundingBox::new(x - 2, y - 2, x + 2, y + 2),
        }
    }

    #[test]
    fn coco_classes_map_to_vehicle_categories() {
        assert_eq!(VehicleCategory::from_coco_class(1), Some(VehicleCategory::Bicycle));
        assert_eq!(VehicleCategory::from_coco_class(2), Some(VehicleCategory::Car));
        assert_eq!(VehicleCategory::from_coco_class(3), Some(VehicleCategory::Motorcycle));
        assert_eq!(VehicleCategory::from_coco_class(5), Some(VehicleCategory::Bus));
        assert_eq!(VehicleCategory::from_coco_class(7), Some(VehicleCategory::Truck));
        assert_eq!(VehicleCategory::from_coco_class(0), None);
        assert_eq!(VehicleCategory::from_coco_class(6), None);
    }

    #[test]
    fn total_counts_every_category_equally() {
        let counts = VehicleCounts::default()
            .with(VehicleCategory::Car, 3)
            .with(VehicleCategory::Bicycle, 2)
            .with(VehicleCategory::Truck, 1);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.get(VehicleCategory::Bus), 0);
    }

    #[test]
    fn detections_outside_region_or_class_are_dropped() {
        let region = RegionOfInterest::from_pairs(&[(0, 0), (100, 0), (100, 100), (0, 100)]);
        let detections = [
            hit(2, 10, 10),
            hit(2, 50, 50),
            hit(7, 90, 20),
            hit(0, 40, 40),
            hit(2, 150, 50),
        ];

        let sample =
            OccupancySample::from_detections(4, &region, DEFAULT_MIN_CONFIDENCE, &detections);

        assert_eq!(sample.lane_id, 4);
        assert_eq!(sample.counts_by_category.car, 2);
        assert_eq!(sample.counts_by_category.truck, 1);
        assert_eq!(sample.total_vehicles(), 3);
        assert_eq!(sample.bounding_boxes.len(), 3);
    }

    #[test]
    fn low_confidence_detections_are_not_counted() {
        let region = RegionOfInterest::from_pairs(&[(0, 0), (100, 0), (100, 100), (0, 100)]);
        let detections = [
            scored(2, 10, 10, 0.9),
            scored(2, 20, 20, 0.1),
            scored(5, 30, 30, DEFAULT_MIN_CONFIDENCE),
            scored(7, 40, 40, f32::NAN),
        ];

        let sample =
            OccupancySample::from_detections(1, &region, DEFAULT_MIN_CONFIDENCE, &detections);
        assert_eq!(sample.counts_by_category.car, 1);
        assert_eq!(sample.counts_by_category.bus, 1);
        assert_eq!(sample.total_vehicles(), 2);

        let strict = OccupancySample::from_detections(1, &region, 0.95, &detections);
        assert!(strict.counts_by_category.is_empty());
    }

    #[test]
    fn counts_serialize_with_every_category() {
        let json = serde_json::to_value(VehicleCounts::default().with(VehicleCategory::Bus, 1)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"car": 0, "motorcycle": 0, "bus": 1, "truck": 0, "bicycle": 0})
        );
    }
}
