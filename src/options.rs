use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedFilter {
    pub hue_tolerance: f32,
    pub min_saturation: f32,
}

impl RedFilter {
    #[must_use]
    pub fn from_sensitivity(sensitivity: f32) -> Self {
        let sensitivity = sensitivity.clamp(0.1, 1.0);
        Self {
            hue_tolerance: 0.03 + sensitivity * 0.07,
            min_saturation: 0.2 - sensitivity * 0.15,
        }
    }
}

impl Default for RedFilter {
    fn default() -> Self {
        Self::from_sensitivity(0.5)
    }
}

impl FromStr for RedFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let sensitivity: f32 = value
            .trim()
            .parse()
            .map_err(|_| format!("invalid red sensitivity: '{value}'"))?;
        if !(0.1..=1.0).contains(&sensitivity) {
            return Err(format!(
                "red sensitivity must be within 0.1..=1.0, got {sensitivity}"
            ));
        }
        Ok(Self::from_sensitivity(sensitivity))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAnchors {
    centers: Vec<f32>,
}

impl ColumnAnchors {
    #[must_use]
    pub fn centers(&self) -> &[f32] {
        &self.centers
    }
}

impl FromStr for ColumnAnchors {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut centers = Vec::new();
        for token in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let center: f32 = token
                .parse()
                .map_err(|_| format!("invalid column anchor: '{token}'"))?;
            if !center.is_finite() || center < 0.0 {
                return Err(format!("column anchor must be a non-negative pixel offset: '{token}'"));
            }
            centers.push(center);
        }

        if centers.is_empty() {
            return Err("column anchors cannot be empty".to_string());
        }
        if centers.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err("column anchors must be strictly increasing".to_string());
        }

        Ok(Self { centers })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub dpi: f32,
    pub crop_margin: u32,
    pub red_filter: RedFilter,
    pub cell_color_tolerance: u8,
    pub saturated_min_saturation: u8,
    pub saturated_min_value: u8,
    pub empty_cell_whiteness: f32,
    pub split_margin: u32,
    pub row_tolerance: f32,
    pub column_tolerance: f32,
    pub merge_tolerance: f32,
    pub column_anchors: Option<ColumnAnchors>,
    pub connector: String,
    pub schedule_delimiter: u8,
    pub intermediate_delimiter: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dpi: 300.0,
            crop_margin: 5,
            red_filter: RedFilter::default(),
            cell_color_tolerance: 60,
            saturated_min_saturation: 80,
            saturated_min_value: 180,
            empty_cell_whiteness: 0.998,
            split_margin: 5,
            row_tolerance: 25.0,
            column_tolerance: 60.0,
            merge_tolerance: 20.0,
            column_anchors: None,
            connector: "i".to_string(),
            schedule_delimiter: b';',
            intermediate_delimiter: b',',
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{ColumnAnchors, RedFilter};

    #[test]
    fn default_red_filter_matches_mid_sensitivity() {
        let filter = RedFilter::default();
        assert!((filter.hue_tolerance - 0.065).abs() < 1e-6);
        assert!((filter.min_saturation - 0.125).abs() < 1e-6);
    }

    #[test]
    fn reject_out_of_range_sensitivity() {
        let err = RedFilter::from_str("1.5").expect_err("sensitivity above 1 should fail");
        assert!(err.contains("0.1..=1.0"));
    }

    #[test]
    fn parse_column_anchors() {
        let anchors = ColumnAnchors::from_str("120, 480,900").expect("anchors should parse");
        assert_eq!(anchors.centers(), &[120.0, 480.0, 900.0]);
    }

    #[test]
    fn reject_unordered_column_anchors() {
        let err = ColumnAnchors::from_str("480,120").expect_err("unordered anchors should fail");
        assert!(err.contains("strictly increasing"));
    }
}
