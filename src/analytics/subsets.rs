//! Domain subset predicates.
//!
//! Membership is decided by plain substring / allow-list checks on the task
//! type and the raw usage payload. A task may match both predicates.

use crate::model::TaskRecord;

/// Task types that always belong to the TikTok dashboard.
pub const TIKTOK_TASK_TYPES: [&str; 4] = ["product", "creative", "tiktok_product", "tiktok_creative"];

/// Domain token marking TikTok API traffic.
pub const TIKTOK_DOMAIN: &str = "tiktok.com";

pub fn is_tiktok_task(task: &TaskRecord) -> bool {
    TIKTOK_TASK_TYPES.contains(&task.task_type_str())
        || task.api_counts_text.contains(TIKTOK_DOMAIN)
}

pub fn is_facebook_task(task: &TaskRecord) -> bool {
    task.task_type
        .as_deref()
        .is_some_and(|t| t.contains("facebook") || t.contains("fb"))
}

pub fn tiktok_tasks<'a>(tasks: &[&'a TaskRecord]) -> Vec<&'a TaskRecord> {
    tasks.iter().copied().filter(|t| is_tiktok_task(t)).collect()
}

pub fn facebook_tasks<'a>(tasks: &[&'a TaskRecord]) -> Vec<&'a TaskRecord> {
    tasks.iter().copied().filter(|t| is_facebook_task(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typed(task_type: &str) -> TaskRecord {
        TaskRecord {
            task_type: Some(task_type.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn tiktok_allow_list_is_exact() {
        assert!(is_tiktok_task(&typed("product")));
        assert!(is_tiktok_task(&typed("tiktok_creative")));
        assert!(!is_tiktok_task(&typed("Product")));
        assert!(!is_tiktok_task(&typed("product_sync")));
    }

    #[test]
    fn tiktok_detected_from_usage_payload() {
        let task = TaskRecord::from_value(&json!({
            "job_id": "x",
            "task_type": "gmv",
            "api_total_counts": {"https://business-api.tiktok.com/open_api/v1.3/gmv/": 4}
        }));
        assert!(is_tiktok_task(&task));
    }

    #[test]
    fn facebook_is_substring_match() {
        assert!(is_facebook_task(&typed("facebook_daily")));
        assert!(is_facebook_task(&typed("fb_breakdown")));
        assert!(!is_facebook_task(&typed("Facebook")));
        assert!(!is_facebook_task(&TaskRecord::default()));
    }

    #[test]
    fn subsets_keep_order() {
        let records = [typed("fb_a"), typed("product"), typed("facebook_b")];
        let refs: Vec<&TaskRecord> = records.iter().collect();
        let fb = facebook_tasks(&refs);
        assert_eq!(fb.len(), 2);
        assert_eq!(fb[0].task_type_str(), "fb_a");
        assert_eq!(fb[1].task_type_str(), "facebook_b");
        assert_eq!(tiktok_tasks(&refs).len(), 1);
    }
}
