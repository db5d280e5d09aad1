use serde::Serialize;
use utoipa::ToSchema;

/// Fixed page size for every post listing. A unit of configuration, not a
/// runtime knob.
pub const POSTS_PER_PAGE: usize = 10;

/// One page of an ordered sequence. Page numbers are 1-indexed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
    /// Total item count across all pages.
    pub count: usize,
}

/// Slice `items` into page `number`. Forgiving on bad input: numbers below
/// 1 clamp to the first page, numbers past the end clamp to the last page,
/// and an empty sequence yields a single empty page.
pub fn paginate<T>(items: Vec<T>, per_page: usize, number: usize) -> Page<T> {
    let count = items.len();
    let total_pages = if count == 0 { 1 } else { count.div_ceil(per_page) };
    let number = number.clamp(1, total_pages);
    let start = (number - 1) * per_page;
    let items: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(per_page)
        .collect();
    Page {
        items,
        number,
        total_pages,
        has_next: number < total_pages,
        has_prev: number > 1,
        count,
    }
}

/// Parse a `page` query value the forgiving way: missing or unparseable
/// input means page 1; range clamping happens in `paginate`.
pub fn parse_page_param(raw: Option<&str>) -> usize {
    raw.and_then(|p| p.trim().parse::<usize>().ok()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_items_page_size_ten() {
        let page1 = paginate((0..13).collect(), 10, 1);
        assert_eq!(page1.items.len(), 10);
        assert_eq!(page1.total_pages, 2);
        assert!(page1.has_next);
        assert!(!page1.has_prev);

        let page2 = paginate((0..13).collect(), 10, 2);
        assert_eq!(page2.items, vec![10, 11, 12]);
        assert!(!page2.has_next);
        assert!(page2.has_prev);

        // out of range clamps to the last page, not an error
        let page3 = paginate((0..13).collect(), 10, 3);
        assert_eq!(page3.items, page2.items);
        assert_eq!(page3.number, 2);

        let page7 = paginate((0..13).collect(), 10, 7);
        assert_eq!(page7.items, vec![10, 11, 12]);
    }

    #[test]
    fn last_page_item_count() {
        let n: usize = 25;
        let s = 10;
        let last = n.div_ceil(s);
        let page = paginate((0..n).collect(), s, last);
        assert_eq!(page.items.len(), n - s * (last - 1));
    }

    #[test]
    fn empty_sequence_yields_one_empty_page() {
        let page = paginate(Vec::<i32>::new(), 10, 4);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next && !page.has_prev);
    }

    #[test]
    fn zero_and_missing_page_params_default_to_one() {
        assert_eq!(parse_page_param(None), 1);
        assert_eq!(parse_page_param(Some("nonsense")), 1);
        assert_eq!(parse_page_param(Some("2")), 2);
        let page = paginate((0..5).collect::<Vec<i32>>(), 10, 0);
        assert_eq!(page.number, 1);
    }

    #[test]
    fn deterministic_slices() {
        let a = paginate((0..40).collect::<Vec<i32>>(), 10, 3);
        let b = paginate((0..40).collect::<Vec<i32>>(), 10, 3);
        assert_eq!(a.items, b.items);
        assert_eq!(a.items, (20..30).collect::<Vec<i32>>());
    }
}
