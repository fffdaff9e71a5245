//! Product card extraction.
//!
//! Cards are parsed independently: a malformed card is recorded as a
//! [`CardFailure`] and skipped, the rest of the page still yields products.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::config::{RatingMode, SelectorConfig};
use super::ScrapeError;
use crate::models::product::{
    parse_description, parse_num_of_reviews, parse_price, parse_rating_attribute, parse_title,
    rating_from_star_count,
};
use crate::models::{Field, FieldParseError, Product};

/// Selectors compiled once per category, plus its rating rule.
#[derive(Debug)]
pub struct CardRules {
    card: Selector,
    title: FieldSelector,
    description: FieldSelector,
    price: FieldSelector,
    rating: FieldSelector,
    rating_attribute: String,
    star: Selector,
    reviews: FieldSelector,
    rating_mode: RatingMode,
}

/// A compiled selector that remembers its source text for error messages.
#[derive(Debug)]
struct FieldSelector {
    field: Field,
    source: String,
    selector: Selector,
}

impl FieldSelector {
    fn compile(field: Field, source: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            field,
            source: source.to_string(),
            selector: compile(source)?,
        })
    }

    fn first<'a>(&self, card: ElementRef<'a>) -> Result<ElementRef<'a>, FieldParseError> {
        card.select(&self.selector)
            .next()
            .ok_or_else(|| FieldParseError::Missing {
                field: self.field,
                selector: self.source.clone(),
            })
    }

    fn text(&self, card: ElementRef<'_>) -> Result<String, FieldParseError> {
        Ok(self.first(card)?.text().collect())
    }

    fn attr(&self, card: ElementRef<'_>, name: &str) -> Result<String, FieldParseError> {
        self.first(card)?
            .value()
            .attr(name)
            .map(str::to_string)
            .ok_or_else(|| FieldParseError::Missing {
                field: self.field,
                selector: format!("{}[{}]", self.source, name),
            })
    }
}

fn compile(source: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(source)
        .map_err(|e| ScrapeError::InvalidSelector(format!("{}: {}", source, e)))
}

impl CardRules {
    pub fn compile(selectors: &SelectorConfig, rating_mode: RatingMode) -> Result<Self, ScrapeError> {
        Ok(Self {
            card: compile(&selectors.card)?,
            title: FieldSelector::compile(Field::Title, &selectors.title)?,
            description: FieldSelector::compile(Field::Description, &selectors.description)?,
            price: FieldSelector::compile(Field::Price, &selectors.price)?,
            rating: FieldSelector::compile(Field::Rating, &selectors.rating)?,
            rating_attribute: selectors.rating_attribute.clone(),
            star: compile(&selectors.star)?,
            reviews: FieldSelector::compile(Field::NumOfReviews, &selectors.reviews)?,
            rating_mode,
        })
    }

    pub fn rating_mode(&self) -> RatingMode {
        self.rating_mode
    }

    fn rating(&self, card: ElementRef<'_>) -> Result<u8, FieldParseError> {
        match self.rating_mode {
            RatingMode::Attribute => {
                parse_rating_attribute(&self.rating.attr(card, &self.rating_attribute)?)
            }
            RatingMode::StarCount => rating_from_star_count(card.select(&self.star).count()),
        }
    }

    /// Build one product from a card fragment.
    pub fn parse_card(&self, card: ElementRef<'_>) -> Result<Product, FieldParseError> {
        Ok(Product {
            title: parse_title(&self.title.attr(card, "title")?)?,
            description: parse_description(&self.description.text(card)?),
            price: parse_price(&self.price.text(card)?)?,
            rating: self.rating(card)?,
            num_of_reviews: parse_num_of_reviews(&self.reviews.text(card)?)?,
        })
    }
}

/// A card that could not be turned into a product.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFailure {
    /// Zero-based position of the card in document order.
    pub index: usize,
    /// Title attribute, if the card had one, to help locate it.
    pub title: Option<String>,
    pub error: FieldParseError,
}

/// Products and failures from one page, both in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub products: Vec<Product>,
    pub failures: Vec<CardFailure>,
}

impl Extraction {
    pub fn card_count(&self) -> usize {
        self.products.len() + self.failures.len()
    }
}

/// Extract every product card from `document`.
pub fn extract(document: &Html, rules: &CardRules) -> Extraction {
    let mut extraction = Extraction::default();

    for (index, card) in document.select(&rules.card).enumerate() {
        match rules.parse_card(card) {
            Ok(product) => extraction.products.push(product),
            Err(error) => {
                let title = rules.title.attr(card, "title").ok();
                warn!(
                    "Skipping card {} ({}): {}",
                    index,
                    title.as_deref().unwrap_or("untitled"),
                    error
                );
                extraction.failures.push(CardFailure {
                    index,
                    title,
                    error,
                });
            }
        }
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, price: &str, rating: u8, reviews: &str) -> String {
        let stars = "<span class=\"ws-icon ws-icon-star\"></span>".repeat(rating as usize);
        format!(
            r#"<div class="col-md-4"><div class="thumbnail">
                <div class="caption">
                    <h4 class="price float-end">{price}</h4>
                    <h4><a href="/product/1" class="title" title="{title}">{title}...</a></h4>
                    <p class="description">{title}&nbsp;laptop,&nbsp;15.6"</p>
                </div>
                <div class="ratings">
                    <p class="review-count float-end">{reviews}</p>
                    <p data-rating="{rating}">{stars}</p>
                </div>
            </div></div>"#
        )
    }

    fn page(cards: &[String]) -> Html {
        Html::parse_document(&format!(
            "<html><body><div class=\"row\">{}</div></body></html>",
            cards.concat()
        ))
    }

    fn rules(mode: RatingMode) -> CardRules {
        CardRules::compile(&SelectorConfig::default(), mode).unwrap()
    }

    #[test]
    fn test_extracts_prices_in_document_order() {
        let doc = page(&[
            card("A", "$1.00", 3, "1 reviews"),
            card("B", "$2.50", 4, "2 reviews"),
            card("C", "$10", 5, "3 reviews"),
        ]);

        let extraction = extract(&doc, &rules(RatingMode::Attribute));

        let titles: Vec<&str> = extraction.products.iter().map(|p| p.title.as_str()).collect();
        let prices: Vec<f64> = extraction.products.iter().map(|p| p.price).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(prices, vec![1.00, 2.50, 10.0]);
        assert!(extraction.failures.is_empty());
    }

    #[test]
    fn test_parses_every_field() {
        let doc = page(&[card("Asus VivoBook", "$1139.54", 2, "14 reviews")]);

        let extraction = extract(&doc, &rules(RatingMode::Attribute));

        assert_eq!(
            extraction.products,
            vec![Product {
                title: "Asus VivoBook".to_string(),
                description: "Asus VivoBook laptop, 15.6\"".to_string(),
                price: 1139.54,
                rating: 2,
                num_of_reviews: 14,
            }]
        );
    }

    #[test]
    fn test_star_count_mode_counts_markers() {
        let doc = page(&[
            card("zero", "$1", 0, "0 reviews"),
            card("three", "$1", 3, "0 reviews"),
            card("five", "$1", 5, "0 reviews"),
        ]);

        let extraction = extract(&doc, &rules(RatingMode::StarCount));

        let ratings: Vec<u8> = extraction.products.iter().map(|p| p.rating).collect();
        assert_eq!(ratings, vec![0, 3, 5]);
    }

    #[test]
    fn test_rating_modes_read_different_encodings() {
        // Attribute says 1, markup shows 4 stars.
        let html = card("mixed", "$1", 4, "0 reviews")
            .replace("data-rating=\"4\"", "data-rating=\"1\"");
        let doc = page(&[html]);

        assert_eq!(extract(&doc, &rules(RatingMode::Attribute)).products[0].rating, 1);
        assert_eq!(extract(&doc, &rules(RatingMode::StarCount)).products[0].rating, 4);
    }

    #[test]
    fn test_malformed_cards_are_skipped_and_recorded() {
        let doc = page(&[
            card("good-1", "$5.00", 4, "3 reviews"),
            card("bad-price", "call us", 4, "3 reviews"),
            card("good-2", "$7.00", 1, "8 reviews"),
            card("bad-reviews", "$9", 2, "many reviews"),
            card("good-3", "$9.99", 5, "0 reviews"),
        ]);

        let extraction = extract(&doc, &rules(RatingMode::Attribute));

        assert_eq!(extraction.products.len(), 3);
        assert_eq!(extraction.failures.len(), 2);
        assert_eq!(extraction.card_count(), 5);

        let bad_price = &extraction.failures[0];
        assert_eq!(bad_price.index, 1);
        assert_eq!(bad_price.title.as_deref(), Some("bad-price"));
        assert_eq!(bad_price.error.field(), Field::Price);

        let bad_reviews = &extraction.failures[1];
        assert_eq!(bad_reviews.index, 3);
        assert_eq!(bad_reviews.error.field(), Field::NumOfReviews);
    }

    #[test]
    fn test_missing_elements_are_reported() {
        let no_price = card("no-price", "$1", 2, "1 reviews")
            .replace("class=\"price float-end\"", "class=\"cost\"");
        let no_title = card("x", "$1", 2, "1 reviews").replace(" title=\"x\"", "");
        let doc = page(&[no_price, no_title]);

        let extraction = extract(&doc, &rules(RatingMode::Attribute));

        assert!(extraction.products.is_empty());
        assert!(matches!(
            &extraction.failures[0].error,
            FieldParseError::Missing { field: Field::Price, selector } if selector == ".price"
        ));
        assert!(matches!(
            &extraction.failures[1].error,
            FieldParseError::Missing { field: Field::Title, .. }
        ));
        assert_eq!(extraction.failures[1].title, None);
    }

    #[test]
    fn test_too_many_stars_rejected() {
        let doc = page(&[card("six", "$1", 6, "0 reviews")]);

        let extraction = extract(&doc, &rules(RatingMode::StarCount));

        assert!(extraction.products.is_empty());
        assert!(matches!(
            extraction.failures[0].error,
            FieldParseError::OutOfRange { value: 6, .. }
        ));
    }

    #[test]
    fn test_page_without_cards_is_empty() {
        let doc = Html::parse_document("<html><body><p>No products</p></body></html>");
        assert_eq!(extract(&doc, &rules(RatingMode::Attribute)), Extraction::default());
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let selectors = SelectorConfig {
            card: "div[".to_string(),
            ..Default::default()
        };
        let err = CardRules::compile(&selectors, RatingMode::Attribute).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidSelector(_)));
    }
}
