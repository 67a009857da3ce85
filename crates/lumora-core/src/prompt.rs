//! Instruction assembly for the LLM collaborator. The model receives the
//! allowed next action for the current step, the accumulated context and
//! the matched products as the only facts it may cite; the wording of the
//! final reply is its job, not ours.

use lumora_schema::{ScoredProduct, SpaceContext, SpaceType};

use crate::machine::Slot;

/// Consultant persona shared by every turn.
pub fn system_prompt() -> String {
    "Ты — консультант по промышленному и офисному освещению. Отвечай кратко, \
     по-деловому, на русском языке. Упоминай только светильники из списка \
     подобранных моделей; никогда не придумывай модели, характеристики и цены. \
     Если данных не хватает, задай один уточняющий вопрос."
        .to_owned()
}

fn space_label(space: SpaceType) -> &'static str {
    match space {
        SpaceType::Office => "офис",
        SpaceType::Workshop => "цех",
        SpaceType::Street => "уличная территория",
        SpaceType::Warehouse => "склад",
        SpaceType::Custom => "объект",
    }
}

/// One clarifying question per slot; the controller picks the first slot
/// still missing so a filled field is never asked about again.
pub fn question_for_slot(slot: Slot) -> &'static str {
    match slot {
        Slot::Area => "Какая площадь объекта в квадратных метрах?",
        Slot::Height => "Какая высота установки светильников в метрах?",
        Slot::Lux => "Какой уровень освещённости нужен, в люксах?",
    }
}

fn context_lines(context: &SpaceContext) -> String {
    let mut lines = String::new();
    if let Some(space) = context.space {
        lines.push_str(&format!("тип объекта: {}\n", space_label(space)));
    }
    if let Some(area) = &context.area {
        lines.push_str(&format!("площадь: {area} м2\n"));
    }
    if let Some(height) = &context.height {
        lines.push_str(&format!("высота: {height} м\n"));
    }
    if let Some(lux) = &context.lux {
        lines.push_str(&format!("освещённость: {lux} лк\n"));
    }
    if lines.is_empty() {
        lines.push_str("пока ничего не известно\n");
    }
    lines
}

/// Greeting step: find out what kind of space the customer is lighting.
pub fn greeting_instruction() -> String {
    "Шаг диалога: приветствие. Поздоровайся и спроси, какой объект нужно \
     осветить: офис, цех, склад, уличная территория или другой объект. \
     Один вопрос, без перечисления моделей."
        .to_owned()
}

/// Questions step: exactly one clarifying question about the given slot.
pub fn question_instruction(space: SpaceType, slot: Slot, context: &SpaceContext) -> String {
    format!(
        "Шаг диалога: сбор параметров объекта ({}).\nЧто уже известно:\n{}\
         Задай ровно один вопрос: {}\nНе спрашивай о том, что уже известно.",
        space_label(space),
        context_lines(context),
        question_for_slot(slot)
    )
}

/// Recommendation step: present the matched products as the only facts.
pub fn recommendation_instruction(
    lead_in: &str,
    products: &[ScoredProduct],
    quantity: Option<u32>,
    context: &SpaceContext,
) -> String {
    let mut instruction = format!(
        "Шаг диалога: рекомендация.\nПараметры объекта:\n{}",
        context_lines(context)
    );

    if products.is_empty() {
        instruction.push_str(
            "Подходящих моделей в каталоге не нашлось. Сообщи об этом честно и \
             предложи уточнить запрос или связаться с менеджером.\n",
        );
        return instruction;
    }

    instruction.push_str("Подобранные модели (единственный допустимый источник фактов):\n");
    for product in products {
        let model = product.product.model.as_deref().unwrap_or("без модели");
        let power = product
            .product
            .power_w
            .map(|p| format!("{p} Вт"))
            .unwrap_or_else(|| "мощность не указана".to_owned());
        let ip = product.product.ip_rating.as_deref().unwrap_or("IP не указан");
        instruction.push_str(&format!(
            "- {model}: {power}, {}, {ip}\n",
            product.display_lumens
        ));
    }
    if let Some(quantity) = quantity {
        instruction.push_str(&format!(
            "Расчётное количество светильников: {quantity} шт.\n"
        ));
    }
    instruction.push_str(&format!(
        "Начни ответ с фразы: \"{lead_in}\" и порекомендуй первую модель из списка."
    ));
    instruction
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumora_schema::{Product, Relevance};

    fn scored(model: &str, power: f64) -> ScoredProduct {
        ScoredProduct {
            product: Product {
                model: Some(model.to_owned()),
                power_w: Some(power),
                ..Product::default()
            },
            score: 7,
            relevance: Relevance::High,
            display_lumens: "13000лм".to_owned(),
        }
    }

    #[test]
    fn question_instruction_carries_known_context() {
        let context = SpaceContext {
            space: Some(SpaceType::Office),
            area: Some("50".into()),
            height: None,
            lux: None,
        };
        let text = question_instruction(SpaceType::Office, Slot::Height, &context);
        assert!(text.contains("площадь: 50 м2"));
        assert!(text.contains("высота установки"));
        assert!(!text.contains("квадратных метрах"));
    }

    #[test]
    fn recommendation_lists_only_matched_products() {
        let context = SpaceContext::default();
        let text =
            recommendation_instruction("Рекомендую:", &[scored("NRG-TOP-100", 100.0)], Some(4), &context);
        assert!(text.contains("NRG-TOP-100"));
        assert!(text.contains("13000лм"));
        assert!(text.contains("4 шт"));
        assert!(text.contains("Рекомендую:"));
    }

    #[test]
    fn empty_match_set_is_stated_honestly() {
        let text = recommendation_instruction("Рекомендую:", &[], None, &SpaceContext::default());
        assert!(text.contains("не нашлось"));
        assert!(!text.contains("Рекомендую:"));
    }
}
