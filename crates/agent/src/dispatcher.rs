//! Dialogue dispatcher for the action assistant
//!
//! Turns one customer message into one reply: classify, check identity,
//! settle the product the message is about, run the gateway operation for the
//! intent and render the outcome. The session's context is locked for the
//! whole dispatch so follow-ups on one session never interleave.

use once_cell::sync::Lazy;
use pharmacy_assistant_config::AssistantConfig;
use pharmacy_assistant_core::{
    AuthContext, CustomerId, DialoguePayload, DialogueResult, Intent, InteractiveComponent,
    OrderId, Product, ProductId,
};
use pharmacy_assistant_persistence::{AuditLog, AuditRecord};
use pharmacy_assistant_text_processing::{
    blend_confidence, is_pronoun, Classification, EntityExtractor, EntityResolver,
    IntentClassifier,
};
use pharmacy_assistant_tools::{CatalogGateway, GatewayError, GatewayResult};
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::{ContextStore, ConversationContext};
use crate::expert::ExpertAssistant;
use crate::renderer::ResponseRenderer;
use crate::AgentError;

// `id` must start a word so names ending in "id" ("antacid 2") are not ids
static PRODUCT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\bid|#)\s*(\d+)").unwrap());

static ORDER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:#|order\s+)(\d+)").unwrap());

static LEADING_QUANTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s+(.+)$").unwrap());

const ADD_ACTIONS: [&str; 3] = ["view_cart", "continue_shopping", "checkout"];
const REORDER_ACTIONS: [&str; 2] = ["view_cart", "checkout"];

/// Product id named in the text: a remembered product whose name appears in
/// the text wins over an explicit `id N` / `#N`
pub fn extract_product_id(text: &str, last_products: &[Product]) -> Option<ProductId> {
    let lowered = text.to_lowercase();
    if let Some(product) = last_products
        .iter()
        .find(|p| lowered.contains(&p.name.to_lowercase()))
    {
        return Some(product.id);
    }
    PRODUCT_ID
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Order id named as `#N` or `order N`
pub fn extract_order_id(text: &str) -> Option<OrderId> {
    ORDER_ID
        .captures(&text.to_lowercase())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Split "2 aspirin" into a quantity and a name
fn split_quantity(entity: &str) -> (Option<u32>, &str) {
    match LEADING_QUANTITY.captures(entity) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(qty), Some(name)) => (qty.as_str().parse().ok(), name.as_str()),
            _ => (None, entity),
        },
        None => (None, entity),
    }
}

/// Entity settled for one dispatch
#[derive(Debug, Clone, Default)]
struct Subject {
    name: Option<String>,
    from_context: bool,
}

/// Search results, with the corrected name when a fuzzy retry found them
struct Found {
    products: Vec<Product>,
    corrected: Option<String>,
}

impl Found {
    fn first(&self) -> Option<&Product> {
        self.products.first()
    }
}

/// Routes classified messages to gateway operations and renders replies
pub struct Dispatcher {
    classifier: IntentClassifier,
    resolver: EntityResolver,
    extractor: EntityExtractor,
    renderer: ResponseRenderer,
    gateway: Arc<dyn CatalogGateway>,
    contexts: Arc<dyn ContextStore>,
    audit: Arc<dyn AuditLog>,
    expert: Option<Arc<ExpertAssistant>>,
    gateway_timeout: Duration,
    order_history_limit: usize,
}

impl Dispatcher {
    /// Dispatcher over the shipped rule table and default settings
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        contexts: Arc<dyn ContextStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Result<Self, AgentError> {
        let defaults = AssistantConfig::default();
        Ok(Self {
            classifier: IntentClassifier::new()?,
            resolver: EntityResolver::new(),
            extractor: EntityExtractor::new(),
            renderer: ResponseRenderer::from_config(&defaults),
            gateway,
            contexts,
            audit,
            expert: None,
            gateway_timeout: defaults.gateway_timeout(),
            order_history_limit: defaults.order_history_limit,
        })
    }

    pub fn with_settings(mut self, config: &AssistantConfig) -> Self {
        self.renderer = ResponseRenderer::from_config(config);
        self.gateway_timeout = config.gateway_timeout();
        self.order_history_limit = config.order_history_limit;
        self
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Answer DrugInfo through the drug expert instead of the static advice
    pub fn with_expert(mut self, expert: Arc<ExpertAssistant>) -> Self {
        self.expert = Some(expert);
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn contexts(&self) -> &Arc<dyn ContextStore> {
        &self.contexts
    }

    /// Handle one message; never fails
    pub async fn handle_query(
        &self,
        text: &str,
        session_key: &str,
        auth: Option<AuthContext>,
    ) -> DialogueResult {
        let started = Instant::now();
        let classification = self.classifier.classify(text);
        let intent = classification.intent;
        let customer = auth.map(|a| a.customer_id);

        let handle = self.contexts.acquire(session_key).await;
        let mut context = handle.lock().await;

        let mut result = self
            .dispatch(text, &classification, customer, &mut context)
            .await;

        result.confidence = self.confidence(text, &result);

        let record = AuditRecord::new(session_key, text, &result.answer)
            .with_user(customer)
            .with_intent(intent.as_str())
            .with_entities(self.audit_entities(text, &classification, &result, &context));
        match self.audit.append(record).await {
            Ok(id) => result.log_id = Some(id),
            Err(e) => tracing::warn!(session = %session_key, error = %e, "Failed to write audit record"),
        }

        metrics::counter!("assistant_queries_total", "intent" => intent.as_str()).increment(1);
        metrics::histogram!("assistant_query_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        tracing::info!(
            session = %session_key,
            intent = %intent,
            entity = ?result.entity,
            from_context = result.from_context,
            requires_auth = result.requires_auth,
            "Handled query"
        );
        result
    }

    /// Entities recorded with the audit record: the raw capture, the settled
    /// medicine, quantity, ids and the structured mentions
    fn audit_entities(
        &self,
        text: &str,
        classification: &Classification,
        result: &DialogueResult,
        context: &ConversationContext,
    ) -> serde_json::Value {
        let (quantity, medicine) = match classification.entity.as_deref() {
            Some(raw) => {
                let (leading, name) = split_quantity(raw);
                (classification.quantity.or(leading), Some(name))
            }
            None => (classification.quantity, None),
        };
        serde_json::json!({
            "entity": classification.entity,
            "medicine": result.entity.as_deref().or(medicine),
            "from_context": result.from_context,
            "quantity": quantity,
            "product_id": extract_product_id(text, context.last_products()),
            "order_id": extract_order_id(text),
            "structured": self.extractor.extract(text),
        })
    }

    async fn dispatch(
        &self,
        text: &str,
        classification: &Classification,
        customer: Option<CustomerId>,
        context: &mut ConversationContext,
    ) -> DialogueResult {
        let intent = classification.intent;

        if let Some(action) = intent.auth_action() {
            if customer.is_none() {
                metrics::counter!("assistant_auth_required_total").increment(1);
                let mut result = DialogueResult::new(intent, self.renderer.auth_required(action));
                result.requires_auth = true;
                return result;
            }
        }

        let subject = self.settle_subject(classification, context);
        if intent.uses_entity() && subject.name.is_none() && !self.can_add_by_id(intent, text, context) {
            let mut result = DialogueResult::new(intent, self.renderer.clarification(intent));
            result.needs_clarification = true;
            context.add_turn(text, result.answer.clone(), None, Some(intent.as_str().to_string()));
            return result;
        }

        match self
            .run_intent(text, classification, &subject, customer, context)
            .await
        {
            Ok(result) => {
                if intent.is_search_like() {
                    if let Some(products) = result.products() {
                        context.set_last_products(products.to_vec());
                    }
                }
                context.add_turn(
                    text,
                    result.answer.clone(),
                    result.entity.clone(),
                    Some(intent.as_str().to_string()),
                );
                result
            }
            Err(e) => {
                let answer = if e.is_domain() {
                    tracing::debug!(intent = %intent, reason = %e, "Gateway rejected request");
                    self.renderer.domain_error(&e)
                } else {
                    tracing::error!(intent = %intent, error = %e, "Gateway call failed");
                    self.renderer.internal_error()
                };
                // No entity, so the last settled entity survives the failure
                context.add_turn(text, answer.clone(), None, Some(intent.as_str().to_string()));
                DialogueResult::new(intent, answer)
                    .with_entity(subject.name.clone(), subject.from_context)
            }
        }
    }

    /// Entity from the message, or from history when the message has none or
    /// only a pronoun
    fn settle_subject(
        &self,
        classification: &Classification,
        context: &ConversationContext,
    ) -> Subject {
        if !classification.intent.uses_entity() {
            return Subject::default();
        }

        match classification.entity.as_deref() {
            Some(entity) if !is_pronoun(entity) => Subject {
                name: Some(entity.to_string()),
                from_context: false,
            },
            _ => match context.get_last_entity() {
                Some(last) => Subject {
                    name: Some(last.to_string()),
                    from_context: true,
                },
                None => Subject::default(),
            },
        }
    }

    fn can_add_by_id(&self, intent: Intent, text: &str, context: &ConversationContext) -> bool {
        intent == Intent::AddToCart && extract_product_id(text, context.last_products()).is_some()
    }

    /// Bound a gateway call by the configured timeout
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        match tokio::time::timeout(self.gateway_timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.gateway_timeout.as_millis() as u64,
                    "Gateway call timed out"
                );
                Err(GatewayError::internal(format!("{operation} timed out")))
            }
        }
    }

    /// Search by name, retrying once with the closest catalog name on a miss
    async fn search_resolving(&self, name: &str) -> GatewayResult<Found> {
        let products = self
            .call("search_products", self.gateway.search_products(name))
            .await?;
        if !products.is_empty() {
            return Ok(Found {
                products,
                corrected: None,
            });
        }

        let names = self
            .call("product_names", self.gateway.product_names())
            .await?;
        let Some((closest, score)) = self.resolver.closest_name(name, &names) else {
            return Ok(Found {
                products,
                corrected: None,
            });
        };

        tracing::debug!(query = name, closest, score, "Retrying search with closest name");
        let products = self
            .call("search_products", self.gateway.search_products(closest))
            .await?;
        let corrected = (!products.is_empty()).then(|| closest.to_string());
        Ok(Found { products, corrected })
    }

    fn prefixed(&self, found: &Found, body: String) -> String {
        match &found.corrected {
            Some(name) => self.renderer.showing_results_for(name, &body),
            None => body,
        }
    }

    async fn run_intent(
        &self,
        text: &str,
        classification: &Classification,
        subject: &Subject,
        customer: Option<CustomerId>,
        context: &ConversationContext,
    ) -> GatewayResult<DialogueResult> {
        let intent = classification.intent;
        let entity = subject.name.as_deref().unwrap_or_default();
        let from_context = subject.from_context;
        // Identity is checked before dispatch; this only guards the types
        let customer_id = || customer.ok_or(GatewayError::CustomerNotFound);

        let result = match intent {
            Intent::Greeting => {
                let name = match customer {
                    Some(id) => match self
                        .call("get_customer_profile", self.gateway.get_customer_profile(id))
                        .await
                    {
                        Ok(profile) => Some(profile.name),
                        Err(e) => {
                            tracing::debug!(customer = id, error = %e, "Greeting without profile");
                            None
                        }
                    },
                    None => None,
                };
                DialogueResult::new(intent, self.renderer.greeting(name.as_deref()))
            }

            Intent::Help => DialogueResult::new(intent, self.renderer.help()),

            Intent::Unknown => DialogueResult::new(intent, self.renderer.unknown()),

            Intent::SearchProduct => {
                let found = self.search_resolving(entity).await?;
                let answer = self.prefixed(&found, self.renderer.product_search(&found.products));
                let settled = match found.products.as_slice() {
                    [only] => Some(only.name.clone()),
                    [] => None,
                    _ => Some(entity.to_string()),
                };
                let mut result = DialogueResult::new(intent, answer).with_entity(settled, from_context);
                if !found.products.is_empty() {
                    result = result.with_component(InteractiveComponent::ProductCard {
                        products: found.products.clone(),
                    });
                }
                result.with_payload(DialoguePayload::Products(found.products))
            }

            Intent::AddToCart => {
                let customer_id = customer_id()?;
                let (leading, name) = split_quantity(entity);
                let quantity = classification.quantity.or(leading).unwrap_or(1).max(1);

                let (product_id, found) = match extract_product_id(text, context.last_products()) {
                    Some(id) => (Some(id), None),
                    None => {
                        let found = self.search_resolving(name).await?;
                        (found.first().map(|p| p.id), Some(found))
                    }
                };
                let Some(product_id) = product_id else {
                    return Ok(DialogueResult::new(intent, self.renderer.not_in_catalog(name)));
                };

                let update = self
                    .call(
                        "add_to_cart",
                        self.gateway.add_to_cart(customer_id, product_id, quantity),
                    )
                    .await?;
                let body = self.renderer.added_to_cart(&update);
                let answer = match &found {
                    Some(found) => self.prefixed(found, body),
                    None => body,
                };
                DialogueResult::new(intent, answer)
                    .with_entity(Some(update.product_name.clone()), from_context)
                    .with_component(InteractiveComponent::cart_actions(&ADD_ACTIONS))
                    .with_payload(DialoguePayload::Cart(update.cart))
            }

            Intent::BulkAdd => {
                let customer_id = customer_id()?;
                let names: Vec<&str> = (1..=2).filter_map(|n| classification.capture(n)).collect();
                if names.is_empty() {
                    let mut result = DialogueResult::new(intent, self.renderer.clarification(intent));
                    result.needs_clarification = true;
                    return Ok(result);
                }

                let mut added = Vec::new();
                let mut failed = Vec::new();
                let mut cart = None;
                for name in names {
                    let (leading, name) = split_quantity(name);
                    let found = self.search_resolving(name).await?;
                    let Some(product) = found.first() else {
                        failed.push((name.to_string(), GatewayError::ProductNotFound.to_string()));
                        continue;
                    };
                    match self
                        .call(
                            "add_to_cart",
                            self.gateway
                                .add_to_cart(customer_id, product.id, leading.unwrap_or(1).max(1)),
                        )
                        .await
                    {
                        Ok(update) => {
                            added.push(update.product_name);
                            cart = Some(update.cart);
                        }
                        Err(e) if e.is_domain() => failed.push((product.name.clone(), e.to_string())),
                        Err(e) => return Err(e),
                    }
                }

                let mut result = DialogueResult::new(
                    intent,
                    self.renderer.bulk_add(&added, &failed, cart.as_ref()),
                );
                if let Some(cart) = cart {
                    result = result
                        .with_component(InteractiveComponent::cart_actions(&ADD_ACTIONS))
                        .with_payload(DialoguePayload::Cart(cart));
                }
                result
            }

            Intent::ViewCart => {
                let cart = self
                    .call("get_cart", self.gateway.get_cart(customer_id()?))
                    .await?;
                let mut result = DialogueResult::new(intent, self.renderer.cart(&cart));
                if !cart.is_empty() {
                    result = result.with_component(InteractiveComponent::CartSummary { cart: cart.clone() });
                }
                result.with_payload(DialoguePayload::Cart(cart))
            }

            Intent::TrackOrder => {
                let tracking = self
                    .call(
                        "track_order",
                        self.gateway.track_order(customer_id()?, extract_order_id(text)),
                    )
                    .await?;
                DialogueResult::new(intent, self.renderer.tracking(&tracking))
                    .with_component(InteractiveComponent::OrderTracking {
                        tracking_data: tracking.clone(),
                    })
                    .with_payload(DialoguePayload::Tracking(tracking))
            }

            Intent::OrderHistory => {
                let orders = self
                    .call(
                        "get_orders",
                        self.gateway.get_orders(customer_id()?, self.order_history_limit),
                    )
                    .await?;
                let mut result = DialogueResult::new(intent, self.renderer.order_history(&orders));
                if !orders.is_empty() {
                    result = result.with_component(InteractiveComponent::OrderList {
                        orders: orders.clone(),
                    });
                }
                result.with_payload(DialoguePayload::Orders(orders))
            }

            Intent::PrescriptionOrder => {
                let mut result = DialogueResult::new(intent, self.renderer.prescription_guide())
                    .with_component(InteractiveComponent::prescription_upload());
                result.requires_file_upload = true;
                result
            }

            Intent::CheckAvailability => {
                let found = self.search_resolving(entity).await?;
                let answer = match found.first() {
                    Some(product) => self.prefixed(&found, self.renderer.availability(product)),
                    None => self.renderer.not_in_catalog(entity),
                };
                let settled = found.first().map(|p| p.name.clone());
                DialogueResult::new(intent, answer)
                    .with_entity(settled, from_context)
                    .with_payload(DialoguePayload::Products(found.products))
            }

            Intent::ProductInfo => {
                let found = self.search_resolving(entity).await?;
                let Some(product) = found.first().cloned() else {
                    return Ok(DialogueResult::new(
                        intent,
                        self.renderer.product_info_missing(entity),
                    ));
                };
                let answer = self.prefixed(&found, self.renderer.product_info(&product));
                DialogueResult::new(intent, answer)
                    .with_entity(Some(product.name.clone()), from_context)
                    .with_component(InteractiveComponent::ProductCard {
                        products: vec![product.clone()],
                    })
                    .with_payload(DialoguePayload::Products(vec![product]))
            }

            Intent::DrugInfo => match &self.expert {
                Some(expert) => {
                    let answer = expert.respond(text, context).await.map_err(|e| {
                        GatewayError::internal(format!("drug expert failed: {e}"))
                    })?;
                    let settled = if answer.found { answer.drug_name.clone() } else { None };
                    let from_context = answer.query_analysis.from_context;
                    DialogueResult::new(intent, answer.answer).with_entity(settled, from_context)
                }
                None => DialogueResult::new(intent, self.renderer.drug_info_fallback())
                    .with_entity(Some(entity.to_string()), from_context),
            },

            Intent::ClearCart => {
                self.call("clear_cart", self.gateway.clear_cart(customer_id()?))
                    .await?;
                DialogueResult::new(intent, self.renderer.cart_cleared())
            }

            Intent::RemoveFromCart => {
                let customer_id = customer_id()?;
                let found = self.search_resolving(entity).await?;
                let Some(product) = found.first() else {
                    return Ok(DialogueResult::new(intent, self.renderer.not_in_cart(entity)));
                };
                let removed = self
                    .call(
                        "remove_from_cart",
                        self.gateway.remove_from_cart(customer_id, product.id),
                    )
                    .await?;
                DialogueResult::new(intent, self.renderer.removed_from_cart(&removed))
                    .with_entity(Some(removed), from_context)
            }

            Intent::UpdateQuantity => {
                let customer_id = customer_id()?;
                let Some(quantity) = classification.quantity else {
                    let mut result = DialogueResult::new(intent, self.renderer.clarification(intent));
                    result.needs_clarification = true;
                    return Ok(result);
                };
                let found = self.search_resolving(entity).await?;
                let Some(product) = found.first() else {
                    return Ok(DialogueResult::new(intent, self.renderer.not_in_cart(entity)));
                };
                let update = self
                    .call(
                        "update_cart_quantity",
                        self.gateway
                            .update_cart_quantity(customer_id, product.id, quantity),
                    )
                    .await?;
                DialogueResult::new(intent, self.renderer.quantity_updated(&update, quantity))
                    .with_entity(Some(update.product_name.clone()), from_context)
                    .with_payload(DialoguePayload::Cart(update.cart))
            }

            Intent::CancelOrder => {
                let customer_id = customer_id()?;
                let order_id = match extract_order_id(text) {
                    Some(id) => Some(id),
                    None => self
                        .call("get_orders", self.gateway.get_orders(customer_id, 1))
                        .await?
                        .first()
                        .map(|o| o.order_id),
                };
                let Some(order_id) = order_id else {
                    return Ok(DialogueResult::new(intent, self.renderer.no_orders_to_cancel()));
                };
                let order = self
                    .call("cancel_order", self.gateway.cancel_order(customer_id, order_id))
                    .await?;
                DialogueResult::new(intent, self.renderer.order_cancelled(&order))
            }

            Intent::Reorder => {
                let outcome = self
                    .call("reorder_last", self.gateway.reorder_last(customer_id()?))
                    .await?;
                DialogueResult::new(intent, self.renderer.reordered(&outcome))
                    .with_component(InteractiveComponent::cart_actions(&REORDER_ACTIONS))
                    .with_payload(DialoguePayload::Reorder(outcome))
            }

            Intent::Recommend => {
                let products = self
                    .call(
                        "get_recommendations",
                        self.gateway.get_recommendations(customer, None),
                    )
                    .await?;
                let mut result = DialogueResult::new(intent, self.renderer.recommendations(&products));
                if !products.is_empty() {
                    result = result.with_component(InteractiveComponent::ProductCard {
                        products: products.clone(),
                    });
                }
                result.with_payload(DialoguePayload::Products(products))
            }

            Intent::ComparePrices => {
                let found = self.search_resolving(entity).await?;
                let answer = self.prefixed(&found, self.renderer.price_comparison(&found.products));
                let settled = (!found.products.is_empty()).then(|| entity.to_string());
                DialogueResult::new(intent, answer)
                    .with_entity(settled, from_context)
                    .with_payload(DialoguePayload::Products(found.products))
            }

            Intent::FindSubstitutes => {
                let found = self.search_resolving(entity).await?;
                let Some(product) = found.first() else {
                    return Ok(DialogueResult::new(
                        intent,
                        self.renderer.substitutes_target_missing(entity),
                    ));
                };
                let list = self
                    .call("find_substitutes", self.gateway.find_substitutes(product.id))
                    .await?;
                let answer = self.prefixed(&found, self.renderer.substitutes(&list));
                let mut result = DialogueResult::new(intent, answer)
                    .with_entity(Some(product.name.clone()), from_context);
                if !list.substitutes.is_empty() {
                    result = result.with_component(InteractiveComponent::ProductCard {
                        products: list.substitutes.iter().map(|s| s.product.clone()).collect(),
                    });
                }
                result.with_payload(DialoguePayload::Substitutes(list))
            }

            Intent::Checkout => {
                let cart = self
                    .call("get_cart", self.gateway.get_cart(customer_id()?))
                    .await?;
                let mut result = DialogueResult::new(intent, self.renderer.checkout(&cart));
                if !cart.is_empty() {
                    result = result.with_component(InteractiveComponent::CheckoutButton);
                }
                result.with_payload(DialoguePayload::Cart(cart))
            }
        };

        Ok(result)
    }

    /// Blend of the settled entity, the intent match, structured entities and
    /// message length
    fn confidence(&self, text: &str, result: &DialogueResult) -> f64 {
        let drug_score = if result.entity.is_some() && !result.from_context {
            100
        } else {
            0
        };
        let intent_confidence = if result.intent == Intent::Unknown { 0.0 } else { 1.0 };
        let has_entities = !self.extractor.extract(text).is_empty();
        blend_confidence(drug_score, intent_confidence, has_entities, text.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmacy_assistant_core::ProductType;

    fn product(id: ProductId, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            generic_name: "x".to_string(),
            company: "y".to_string(),
            price: 10.0,
            quantity: 5,
            product_type: ProductType::Otc,
        }
    }

    #[test]
    fn test_extract_product_id() {
        let last = vec![product(3, "Aspirin 75mg"), product(9, "Crocin")];
        assert_eq!(extract_product_id("add crocin please", &last), Some(9));
        assert_eq!(extract_product_id("add id 42", &last), Some(42));
        assert_eq!(extract_product_id("add #7 to cart", &[]), Some(7));
        assert_eq!(extract_product_id("add aspirin", &last), None);
        assert_eq!(extract_product_id("antacid 2", &[]), None);
        assert_eq!(extract_product_id("product id2", &[]), Some(2));
    }

    #[test]
    fn test_extract_order_id() {
        assert_eq!(extract_order_id("track order #12"), Some(12));
        assert_eq!(extract_order_id("cancel order 5"), Some(5));
        assert_eq!(extract_order_id("Cancel Order 5"), Some(5));
        assert_eq!(extract_order_id("cancel my order"), None);
    }

    #[test]
    fn test_split_quantity() {
        assert_eq!(split_quantity("2 aspirin"), (Some(2), "aspirin"));
        assert_eq!(split_quantity("aspirin"), (None, "aspirin"));
        assert_eq!(split_quantity("vitamin b12"), (None, "vitamin b12"));
    }
}
