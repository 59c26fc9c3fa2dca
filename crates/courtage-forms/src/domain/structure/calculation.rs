//! Calculation Rule Block
//!
//! Premium calculation authored inside a `calculation_rules` sub-step:
//! a base formula over named variables, coefficients applied to it, and
//! taxes expressed as percentages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::editor::EditError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationRuleBlock {
    #[serde(rename = "baseFormula", default)]
    pub base_formula: String,
    #[serde(default)]
    pub coefficients: Vec<Coefficient>,
    #[serde(default)]
    pub taxes: Vec<Tax>,
}

/// Named multiplier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub value: Decimal,
}

/// Named percentage applied on top of (or deducted from) the premium
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    pub name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub kind: TaxKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxKind {
    #[default]
    Addition,
    Deduction,
}

impl Tax {
    pub fn addition(name: impl Into<String>, rate: Decimal) -> Self {
        Self { name: name.into(), rate, kind: TaxKind::Addition }
    }

    pub fn deduction(name: impl Into<String>, rate: Decimal) -> Self {
        Self { name: name.into(), rate, kind: TaxKind::Deduction }
    }
}

impl CalculationRuleBlock {
    pub fn set_base_formula(&mut self, formula: impl Into<String>) {
        self.base_formula = formula.into();
    }

    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    pub fn add_coefficient(&mut self, name: impl Into<String>, value: Decimal) -> Result<(), EditError> {
        let name = name.into();
        if self.coefficient(&name).is_some() {
            return Err(EditError::DuplicateName { name });
        }
        self.coefficients.push(Coefficient { name, value });
        Ok(())
    }

    pub fn update_coefficient(&mut self, name: &str, value: Decimal) -> Result<(), EditError> {
        let coefficient = self
            .coefficients
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EditError::NameNotFound { name: name.to_string() })?;
        coefficient.value = value;
        Ok(())
    }

    pub fn remove_coefficient(&mut self, name: &str) -> Result<Coefficient, EditError> {
        let index = self
            .coefficients
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EditError::NameNotFound { name: name.to_string() })?;
        Ok(self.coefficients.remove(index))
    }

    pub fn add_tax(&mut self, tax: Tax) -> Result<(), EditError> {
        if self.taxes.iter().any(|t| t.name == tax.name) {
            return Err(EditError::DuplicateName { name: tax.name });
        }
        self.taxes.push(tax);
        Ok(())
    }

    pub fn remove_tax(&mut self, name: &str) -> Result<Tax, EditError> {
        let index = self
            .taxes
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| EditError::NameNotFound { name: name.to_string() })?;
        Ok(self.taxes.remove(index))
    }

    /// Identifiers the base formula reads, in order of first appearance.
    ///
    /// Identifiers directly followed by `(` are function names and are
    /// not reported.
    pub fn referenced_variables(&self) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let chars: Vec<char> = self.base_formula.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_alphabetic() || c == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let mut next = i;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                let is_call = chars.get(next) == Some(&'(');
                if !is_call && !found.contains(&ident) {
                    found.push(ident);
                }
            } else if c.is_ascii_digit() || c == '.' {
                // numeric literal, including forms like 1e3
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> CalculationRuleBlock {
        CalculationRuleBlock {
            base_formula: "valeur_vehicule * taux_base + max(franchise, 150)".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_referenced_variables_skip_functions_and_numbers() {
        assert_eq!(
            block().referenced_variables(),
            vec!["valeur_vehicule", "taux_base", "franchise"]
        );
    }

    #[test]
    fn test_referenced_variables_are_deduplicated() {
        let b = CalculationRuleBlock {
            base_formula: "a * a + b2 - 1.5e2".into(),
            ..Default::default()
        };
        assert_eq!(b.referenced_variables(), vec!["a", "b2"]);
    }

    #[test]
    fn test_coefficient_names_are_unique() {
        let mut b = block();
        b.add_coefficient("bonus_malus", Decimal::new(95, 2)).unwrap();
        assert_eq!(
            b.add_coefficient("bonus_malus", Decimal::ONE),
            Err(EditError::DuplicateName { name: "bonus_malus".into() })
        );
        assert_eq!(b.coefficients.len(), 1);
    }

    #[test]
    fn test_update_and_remove_coefficient() {
        let mut b = block();
        b.add_coefficient("zone", Decimal::new(110, 2)).unwrap();
        b.update_coefficient("zone", Decimal::new(120, 2)).unwrap();
        assert_eq!(b.coefficient("zone").unwrap().value, Decimal::new(12, 1));

        let removed = b.remove_coefficient("zone").unwrap();
        assert_eq!(removed.name, "zone");
        assert!(matches!(b.remove_coefficient("zone"), Err(EditError::NameNotFound { .. })));
    }

    #[test]
    fn test_taxes_keep_insertion_order() {
        let mut b = block();
        b.add_tax(Tax::addition("taxe_assurance", Decimal::new(18, 0))).unwrap();
        b.add_tax(Tax::deduction("remise_fidelite", Decimal::new(5, 0))).unwrap();
        assert!(b.add_tax(Tax::addition("taxe_assurance", Decimal::ONE)).is_err());

        let names: Vec<_> = b.taxes.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["taxe_assurance", "remise_fidelite"]);
        assert_eq!(b.remove_tax("taxe_assurance").unwrap().kind, TaxKind::Addition);
    }

    #[test]
    fn test_storage_shape_uses_camel_case_formula() {
        let json = serde_json::to_value(block()).unwrap();
        assert!(json.get("baseFormula").is_some());
        let back: CalculationRuleBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block());
    }
}
