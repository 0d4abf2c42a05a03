use vault_core::{query, Facet, PageRequest, QueryError, Record, SearchQuery};

fn bond(id: &str, issuer: &str, isin: &str) -> Record {
    [("id", id), ("issuer_name", issuer), ("isin", isin)]
        .into_iter()
        .collect()
}

fn numbered(count: usize) -> Vec<Record> {
    (1..=count)
        .map(|index| {
            let id = index.to_string();
            bond(&id, &format!("Issuer {index}"), &format!("IN{index:03}"))
        })
        .collect()
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(Record::id).collect()
}

#[test]
fn search_is_case_insensitive_substring() {
    let bonds = vec![bond("1", "Alpha", "IN001"), bond("2", "Beta Corp", "IN002")];
    let page = query(
        &bonds,
        &SearchQuery::bonds("beta"),
        PageRequest::new(1, 10).expect("page"),
    );
    assert_eq!(ids(&page.items), vec!["2"]);
    assert_eq!(page.items[0].get("issuer_name"), Some("Beta Corp"));
}

#[test]
fn empty_search_returns_newest_first() {
    let bonds = numbered(5);
    let page = query(&bonds, &SearchQuery::bonds(""), PageRequest::new(1, 3).expect("page"));
    assert_eq!(ids(&page.items), vec!["5", "4", "3"]);
    assert_eq!(page.total, 5);
}

#[test]
fn page_sizes_match_expected_counts() {
    let total = 23usize;
    let bonds = numbered(total);
    for page_size in 1..=10usize {
        for page in 1..=6usize {
            let request = PageRequest::new(page as i64, page_size as i64).expect("page");
            let result = query(&bonds, &SearchQuery::bonds(""), request);
            let expected = page_size.min(total.saturating_sub((page - 1) * page_size));
            assert_eq!(result.items.len(), expected, "page={page} size={page_size}");
        }
    }
}

#[test]
fn page_past_the_end_is_empty() {
    let bonds = numbered(3);
    let page = query(&bonds, &SearchQuery::bonds(""), PageRequest::new(9, 10).expect("page"));
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
}

#[test]
fn invalid_pagination_is_rejected() {
    assert!(matches!(
        PageRequest::new(0, 10),
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        PageRequest::new(1, 0),
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        PageRequest::new(-3, 10),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[test]
fn input_is_not_mutated() {
    let bonds = numbered(4);
    let before = bonds.clone();
    let _ = query(&bonds, &SearchQuery::bonds("issuer"), PageRequest::default());
    assert_eq!(bonds, before);
}

#[test]
fn records_without_search_fields_do_not_match() {
    let bonds = vec![
        [("id", "1"), ("coupon_rate", "7.1")].into_iter().collect(),
        bond("2", "Gamma", "IN777"),
    ];
    let page = query(&bonds, &SearchQuery::bonds("7"), PageRequest::default());
    assert_eq!(ids(&page.items), vec!["2"]);
}

#[test]
fn facets_narrow_results() {
    let mut first = bond("1", "Alpha", "IN001");
    first.insert("credit_rating_agency", "CRISIL");
    let mut second = bond("2", "Alpha", "IN002");
    second.insert("credit_rating_agency", "ICRA");
    let third = bond("3", "Beta", "IN003");
    let bonds = vec![first, second, third];

    let search = SearchQuery::bonds("")
        .with_facet(Facet::new("issuer_name", vec!["alpha".to_string()]))
        .with_facet(Facet::new("credit_rating_agency", vec!["crisil".to_string(), "care".to_string()]));
    let page = query(&bonds, &search, PageRequest::default());
    assert_eq!(ids(&page.items), vec!["1"]);
}
